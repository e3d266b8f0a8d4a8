use tfcrud::{AttributeBuilder, AttributeType, ResourceSchema, SchemaBuilder, SchemaError, ValidationRule};

pub const TYPE_NAME: &str = "guardrail_rate_limit_rule";

pub fn schema() -> Result<ResourceSchema, SchemaError> {
    SchemaBuilder::new(TYPE_NAME, "/v1/rate-limits")
        .description("Per-zone request rate limit")
        .envelope("result")
        .attribute(
            AttributeBuilder::string("zone_id")
                .required()
                .forces_recreate()
                .wire_name("zoneId")
                .description("Zone the rule belongs to; moving it replaces the rule"),
        )
        .attribute(
            AttributeBuilder::string("name")
                .required()
                .regex("^[a-zA-Z0-9-]+$"),
        )
        .attribute(
            AttributeBuilder::int("threshold")
                .required()
                .range(1, 1_000_000)
                .wire_name("requestsPerPeriod"),
        )
        .attribute(
            AttributeBuilder::int("period_seconds")
                .required()
                .range(10, 86_400)
                .wire_name("period"),
        )
        .attribute(
            AttributeBuilder::string("action")
                .required()
                .one_of(["block", "challenge", "log"]),
        )
        .attribute(
            AttributeBuilder::int("mitigation_timeout")
                .optional()
                .validation(ValidationRule::at_least(0))
                .wire_name("mitigationTimeout"),
        )
        .attribute(AttributeBuilder::bool("enabled").optional())
        .attribute(
            AttributeBuilder::new("match_paths", AttributeType::list(AttributeType::String))
                .optional()
                .min_length(1)
                .wire_name("matchPaths"),
        )
        .build()
}
