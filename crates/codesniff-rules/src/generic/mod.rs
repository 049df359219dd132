//! The `Generic` standard: language-neutral sniffs.

pub mod disallow_tab_indent;
pub mod duplicate_function_name;
pub mod todo;

pub use disallow_tab_indent::DisallowTabIndent;
pub use duplicate_function_name::DuplicateFunctionName;
pub use todo::Todo;

use codesniff_core::{RegistryError, SniffInstance, SniffRegistry, Standard};

/// Standard name.
pub const STANDARD: &str = "Generic";

/// Registers the standard and its sniffs.
///
/// # Errors
///
/// Returns an error if a sniff code is malformed.
pub fn register(registry: &mut SniffRegistry) -> Result<(), RegistryError> {
    registry.add_standard(Standard::builtin(
        STANDARD,
        "Language-neutral checks shared by other standards",
    ));
    registry.register(disallow_tab_indent::CODE, || {
        Ok(SniffInstance::token(DisallowTabIndent::new()))
    })?;
    registry.register(todo::CODE, || Ok(SniffInstance::token(Todo::new()?)))?;
    registry.register(duplicate_function_name::CODE, || {
        Ok(SniffInstance::batch(DuplicateFunctionName::new()))
    })?;
    Ok(())
}
