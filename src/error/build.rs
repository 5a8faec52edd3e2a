//! Asset pipeline and plugin errors

use super::BpmError;

/// Creates an asset not found error
pub fn asset_not_found(logical_path: impl Into<String>) -> BpmError {
    BpmError::AssetNotFound {
        logical_path: logical_path.into(),
    }
}

/// Creates a cyclic require error
pub fn cyclic_require(path: impl Into<String>) -> BpmError {
    BpmError::CyclicRequire { path: path.into() }
}

/// Creates a plugin failure error
pub fn plugin_failed(plugin: impl Into<String>, reason: impl Into<String>) -> BpmError {
    BpmError::PluginFailed {
        plugin: plugin.into(),
        reason: reason.into(),
    }
}
