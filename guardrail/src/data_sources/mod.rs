//! Data sources are lookups by id over resource schemas

use tfcrud::{ResourceSchema, SchemaError};

use crate::resources::{access_list, user};

/// Resource schemas that are also exposed as data sources
pub fn all() -> Result<Vec<ResourceSchema>, SchemaError> {
    Ok(vec![access_list::schema()?, user::schema()?])
}
