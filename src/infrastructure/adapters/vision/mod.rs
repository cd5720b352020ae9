//! Vision Adapter - 图片替代文本

mod cached_image_describer;
mod fake_image_describer;
mod http_image_describer;

pub use cached_image_describer::CachedImageDescriber;
pub use fake_image_describer::FakeImageDescriber;
pub use http_image_describer::{data_url, HttpImageDescriber};
