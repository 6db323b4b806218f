pub mod probe;
pub mod upstream;

pub use probe::HttpRedirectProbe;
pub use upstream::HttpUpstream;
