pub mod color;
pub mod color_cluster;
pub mod compositor;
pub mod pixel_grid;
pub mod region_locator;
pub mod validator;
