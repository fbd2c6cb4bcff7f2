pub mod chat;
pub mod work_item;
pub mod write_back;
