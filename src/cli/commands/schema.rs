//! Schema command - describe the fields a rule accepts.

use super::{CommandContext, Runnable};
use anyhow::Result;
use azmon_rules::monitor::{rule_schema, RESOURCE_TYPE};
use azmon_rules::schema::{BlockSchema, FieldKind, Presence};
use clap::Parser;
use serde_json::json;

/// Arguments for the schema command
#[derive(Parser, Debug, Clone)]
pub struct SchemaArgs {}

impl SchemaArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let schema = rule_schema();

        if ctx.output.is_json() {
            ctx.output.document(&json!({
                "resource_type": RESOURCE_TYPE,
                "schema": schema,
            }))?;
            return Ok(0);
        }

        ctx.output.section(RESOURCE_TYPE);
        ctx.output.table(
            &["field", "type", "presence", "replace", "description"],
            &schema_rows(schema, ""),
        );
        Ok(0)
    }
}

/// One row per field, nested blocks flattened into dotted paths.
fn schema_rows(schema: &BlockSchema, prefix: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();

    for field in &schema.fields {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{}.{}", prefix, field.name)
        };

        let kind = match &field.kind {
            FieldKind::Primitive { elem } => elem.to_string(),
            FieldKind::List { elem } => format!("list({})", elem),
            FieldKind::Set { elem } => format!("set({})", elem),
            FieldKind::Map { elem } => format!("map({})", elem),
            FieldKind::Block { max_items: Some(1), .. } => "block".to_string(),
            FieldKind::Block { .. } => "blocks".to_string(),
        };
        let presence = match field.presence {
            Presence::Required => "required",
            Presence::Optional => "optional",
            Presence::Computed => "computed",
        };

        rows.push(vec![
            path.clone(),
            kind,
            presence.to_string(),
            if field.force_new { "yes" } else { "" }.to_string(),
            field.description.to_string(),
        ]);

        if let FieldKind::Block { schema, .. } = &field.kind {
            rows.extend(schema_rows(schema, &path));
        }
    }

    rows
}

#[async_trait::async_trait]
impl Runnable for SchemaArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
