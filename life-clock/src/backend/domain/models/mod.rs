pub mod bucket_list;
pub mod goal;
pub mod journal;
pub mod milestone;
pub mod profile;
