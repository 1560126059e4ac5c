mod document_port;
mod image_fetch_port;
mod link_resolver_port;
mod settings_port;

pub use document_port::PreviewDocument;
#[cfg(test)]
pub use image_fetch_port::MockImageFetchPort;
pub use image_fetch_port::{CacheError, CacheResult, ImageFetchPort};
pub use link_resolver_port::LinkResolverPort;
pub use settings_port::PreviewSettingsPort;
