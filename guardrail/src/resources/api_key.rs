use tfcrud::{AttributeBuilder, AttributeType, ResourceSchema, SchemaBuilder, SchemaError};

pub const TYPE_NAME: &str = "guardrail_api_key";

/// API key. Keys are immutable: any change issues a new key.
pub fn schema() -> Result<ResourceSchema, SchemaError> {
    SchemaBuilder::new(TYPE_NAME, "/v1/api-keys")
        .description("Scoped API key; the secret is only returned on creation")
        .envelope("data")
        .id_path("key_id")
        .attribute(
            AttributeBuilder::string("name")
                .required()
                .forces_recreate()
                .min_length(1),
        )
        .attribute(
            AttributeBuilder::new("scopes", AttributeType::list(AttributeType::String))
                .required()
                .forces_recreate()
                .min_length(1)
                .description("Permission scopes, e.g. `rules:read`"),
        )
        .attribute(
            AttributeBuilder::int("expires_in_days")
                .optional()
                .forces_recreate()
                .range(1, 365),
        )
        .attribute(
            AttributeBuilder::string("secret")
                .computed()
                .sensitive()
                .description("Key material, only known right after creation"),
        )
        .attribute(
            AttributeBuilder::string("prefix")
                .computed()
                .description("First characters of the secret, safe to display"),
        )
        .build()
}
