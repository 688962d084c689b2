pub mod client;
pub mod product;
pub mod proposal;
pub mod rule;
pub mod suggested_edit;
pub mod tenant;
pub mod version;
