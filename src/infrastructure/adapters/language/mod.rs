//! Language Adapter - 非主语言检测

mod fake_language_detector;
mod http_language_detector;

pub use fake_language_detector::FakeLanguageDetector;
pub use http_language_detector::HttpLanguageDetector;
