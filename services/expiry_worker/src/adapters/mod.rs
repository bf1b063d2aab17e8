pub mod db;
pub mod fcm;

pub use db::DbAdapter;
pub use fcm::FcmPushAdapter;
