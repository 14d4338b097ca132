use juniper::{GraphQLScalar, InputValue, ScalarValue};
use mongodb::bson::oid::ObjectId;
use std::{fmt, str::FromStr};


/// The identifier of a user, post or comment.
///
/// In the API, this is the 24 hex digit string representation of the MongoDB
/// `ObjectId`. Input strings are converted to a real `ObjectId` right away, so
/// that all lookups use the store's native identifier type. Strings that are
/// not valid object ids are rejected as invalid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, GraphQLScalar)]
#[graphql(
    name = "ID",
    description = "An opaque, unique identifier",
    to_output_with = Self::to_output,
    from_input_with = Self::from_input,
    parse_token(String),
)]
pub(crate) struct Id(ObjectId);

impl Id {
    pub(crate) fn object_id(self) -> ObjectId {
        self.0
    }

    fn to_output<S: ScalarValue>(&self) -> juniper::Value<S> {
        juniper::Value::scalar(self.to_string())
    }

    fn from_input<S: ScalarValue>(input: &InputValue<S>) -> Result<Self, String> {
        let s = input.as_string_value().ok_or("expected string")?;
        s.parse().map_err(|_| format!("'{s}' is not a valid ID"))
    }
}

impl From<ObjectId> for Id {
    fn from(value: ObjectId) -> Self {
        Self(value)
    }
}

impl FromStr for Id {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s).map(Self)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}
