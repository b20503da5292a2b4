pub(crate) mod composite;
pub(crate) mod downscale;
pub(crate) mod overlay;
pub(crate) mod text;
