//! HTTP handlers, one module per resource.

pub mod channels;
pub mod properties;
pub mod tags;

fn default_with_channels() -> bool {
    true
}
