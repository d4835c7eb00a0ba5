pub mod border;
pub mod box_filter;
pub mod context;
pub mod dispatch;
pub mod element;
pub mod ext;
pub mod inter_area;
pub mod norm;
pub mod resize;
pub mod resize_linear;
pub mod resize_nearest;
pub mod view;
