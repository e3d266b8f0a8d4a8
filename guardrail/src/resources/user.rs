use tfcrud::{AttributeBuilder, ResourceSchema, SchemaBuilder, SchemaError, UpdateMethod};

pub const TYPE_NAME: &str = "guardrail_user";

/// Console user. The email is the login and cannot be changed in place.
pub fn schema() -> Result<ResourceSchema, SchemaError> {
    SchemaBuilder::new(TYPE_NAME, "/v1/users")
        .description("Guardrail console user")
        .update_method(UpdateMethod::Put)
        .attribute(
            AttributeBuilder::string("email")
                .required()
                .forces_recreate()
                .regex(r"[^@\s]+@[^@\s]+\.[^@\s]+")
                .description("Login email; changing it replaces the user"),
        )
        .attribute(
            AttributeBuilder::string("display_name")
                .optional()
                .wire_name("displayName"),
        )
        .attribute(
            AttributeBuilder::string("role")
                .required()
                .one_of(["admin", "analyst", "viewer"]),
        )
        .attribute(
            AttributeBuilder::bool("active")
                .optional()
                .description("Disabled users keep their history but cannot log in"),
        )
        .attribute(
            AttributeBuilder::bool("mfa_enabled")
                .computed()
                .wire_name("mfaEnabled"),
        )
        .attribute(
            AttributeBuilder::string("created_at")
                .computed()
                .wire_name("createdAt"),
        )
        .build()
}
