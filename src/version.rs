pub mod version_edit;
pub mod version_set;
