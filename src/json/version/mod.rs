pub mod asset_index;
pub mod manifest;
pub mod meta;
pub mod profile;
