//! The `Squiz` standard.
//!
//! Besides its own sniffs the standard pulls two `Generic` sniffs in
//! through an embedded rule-set.

pub mod control_signature;
pub mod function_comment_tags;
pub mod function_declaration;
pub mod inner_functions;
pub mod object_member_comma;
pub mod valid_variable_name;

pub use control_signature::ControlSignature;
pub use function_comment_tags::FunctionCommentTags;
pub use function_declaration::FunctionDeclaration;
pub use inner_functions::InnerFunctions;
pub use object_member_comma::ObjectMemberComma;
pub use valid_variable_name::ValidVariableName;

use codesniff_core::pattern::PatternSniff;
use codesniff_core::tokenizer::JsTokenizer;
use codesniff_core::{RegistryError, SniffInstance, SniffRegistry, Standard};

/// Standard name.
pub const STANDARD: &str = "Squiz";

/// Rule-set shipped with the standard.
pub const RULESET: &str = include_str!("../../standards/squiz.xml");

/// Registers the standard and its sniffs.
///
/// # Errors
///
/// Returns an error if a sniff code is malformed.
pub fn register(registry: &mut SniffRegistry) -> Result<(), RegistryError> {
    registry.add_standard(
        Standard::builtin(STANDARD, "House style for mixed server and browser code").with_ruleset(RULESET),
    );

    // Pattern templates are lexed with the script tokenizer; both families
    // share the token kinds they use.
    registry.register(control_signature::CODE, || {
        let sniff = PatternSniff::new(ControlSignature::new(), &JsTokenizer::new())?;
        Ok(SniffInstance::token(sniff))
    })?;
    registry.register(function_declaration::CODE, || {
        let sniff = PatternSniff::new(FunctionDeclaration::new(), &JsTokenizer::new())?;
        Ok(SniffInstance::token(sniff))
    })?;
    registry.register(inner_functions::CODE, || {
        Ok(SniffInstance::token(inner_functions::sniff()?))
    })?;
    registry.register(function_comment_tags::CODE, || {
        Ok(SniffInstance::token(FunctionCommentTags::new()))
    })?;
    registry.register(object_member_comma::CODE, || {
        Ok(SniffInstance::token(ObjectMemberComma::new()))
    })?;
    registry.register(valid_variable_name::CODE, || {
        Ok(SniffInstance::token(valid_variable_name::sniff()?))
    })?;
    Ok(())
}
