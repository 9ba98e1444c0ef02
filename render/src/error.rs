use tracker_attributes::{AttributeType, CodecError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("{0} definitions have no control")]
    NotRenderable(AttributeType),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("{action} is not supported by a {control} control")]
    UnsupportedAction {
        action: &'static str,
        control: AttributeType,
    },

    #[error("attribute {attribute_id} is required and cannot be left empty")]
    RequiredValue { attribute_id: String },

    #[error("option {option_id} does not belong to attribute {attribute_id}")]
    UnknownOption {
        attribute_id: String,
        option_id: String,
    },

    #[error("{file} is not one of the accepted formats {accepted:?}")]
    UnsupportedFormat { file: String, accepted: Vec<String> },
}
