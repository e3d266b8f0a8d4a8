use tfcrud::{AttributeBuilder, AttributeType, ResourceSchema, SchemaBuilder, SchemaError};

pub const TYPE_NAME: &str = "guardrail_access_list";

/// Named set of IP ranges or countries that firewall rules allow or block
pub fn schema() -> Result<ResourceSchema, SchemaError> {
    SchemaBuilder::new(TYPE_NAME, "/v1/access-lists")
        .description("IP or country list referenced by firewall rules")
        .envelope("result")
        .attribute(
            AttributeBuilder::string("name")
                .required()
                .regex("^[a-zA-Z0-9-]+$")
                .description("List name, letters, digits and dashes only"),
        )
        .attribute(
            AttributeBuilder::string("access")
                .required()
                .one_of(["allow", "block"])
                .description("Whether matching traffic is allowed or blocked"),
        )
        .attribute(
            AttributeBuilder::string("description")
                .optional()
                .description("Free-form description"),
        )
        .attribute(
            AttributeBuilder::new(
                "entries",
                AttributeType::list(AttributeType::map(AttributeType::String)),
            )
            .optional()
            .min_length(1)
            .description("Entries, each with a `value` (CIDR or country code) and optional `comment`"),
        )
        .attribute(
            AttributeBuilder::new("tags", AttributeType::map(AttributeType::String))
                .optional()
                .description("Key/value labels"),
        )
        .attribute(
            AttributeBuilder::int("entry_count")
                .computed()
                .wire_name("entryCount")
                .description("Number of entries stored by the server"),
        )
        .attribute(
            AttributeBuilder::string("created_at")
                .computed()
                .wire_name("createdAt"),
        )
        .attribute(
            AttributeBuilder::string("modified_at")
                .computed()
                .wire_name("modifiedAt"),
        )
        .build()
}
