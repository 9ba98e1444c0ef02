//! `tracker` command-line interface.
//!
//! ## Commands
//!
//! - `tracker types`
//! - `tracker entities --project <ID>`
//! - `tracker entity <ENTITY_ID>`
//! - `tracker values --project <ID> --issue <ID> --entity <ID>`
//! - `tracker set --project <ID> --issue <ID> --entity <ID> --attribute <ID> <VALUE>`
//! - `tracker unset --project <ID> --issue <ID> --entity <ID> --attribute <ID>`
//!
//! Every command accepts `--json`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracker_attributes::{AttributeDefinition, AttributeType, ValueChange, encode_for, parse_input};
use tracker_client::AttributesApi;
use tracker_render::{AttributeControl, ControlKind, NumberDisplay, render};
use tracker_store::AttributeStores;

#[derive(Debug, Parser)]
#[command(name = "tracker", version, about = "Inspect and edit custom attributes")]
pub struct Cli {
    /// Workspace slug.
    #[arg(long, short = 'w', env = "TRACKER_WORKSPACE", global = true, default_value = "")]
    pub workspace: String,

    /// Client config file (defaults to ~/.config/tracker/client.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the supported attribute types.
    Types,
    /// List the entities of a project.
    Entities {
        #[arg(long, short = 'p')]
        project: String,
    },
    /// Show an entity with its attributes and options.
    Entity { entity_id: String },
    /// Show the attribute values of an issue.
    Values(RecordArgs),
    /// Set one attribute value of an issue.
    Set {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long, short = 'a')]
        attribute: String,
        /// Raw value; option ids for selects, comma-separated for multi-selects.
        value: String,
    },
    /// Remove one attribute value from an issue.
    Unset {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long, short = 'a')]
        attribute: String,
    },
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    #[arg(long, short = 'p')]
    pub project: String,
    #[arg(long, short = 'i')]
    pub issue: String,
    /// Entity whose attributes apply to the issue.
    #[arg(long, short = 'e')]
    pub entity: String,
}

impl Cli {
    fn workspace(&self) -> anyhow::Result<&str> {
        if self.workspace.is_empty() {
            bail!("a workspace is required (--workspace or TRACKER_WORKSPACE)");
        }
        Ok(&self.workspace)
    }
}

/// Execute `cli` against `api`, writing human or JSON output to `out`.
pub async fn run(cli: &Cli, api: Arc<dyn AttributesApi>, out: &mut impl Write) -> anyhow::Result<()> {
    let stores = AttributeStores::new(api);
    match &cli.command {
        Command::Types => print_types(cli.json, out),
        Command::Entities { project } => {
            let entities = stores
                .definitions
                .fetch_entities_list(cli.workspace()?, project)
                .await?;
            if cli.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&entities)?)?;
            } else {
                for entity in &entities {
                    writeln!(out, "{}\t{}", entity.id, entity.display_name)?;
                }
            }
            Ok(())
        }
        Command::Entity { entity_id } => {
            let entity = stores
                .definitions
                .fetch_entity_details(cli.workspace()?, entity_id)
                .await?;
            print_entity(cli.json, &entity, out)
        }
        Command::Values(record) => {
            let workspace = cli.workspace()?;
            let controls = load_controls(&stores, workspace, record).await?;
            print_controls(cli.json, &controls, out)
        }
        Command::Set {
            record,
            attribute,
            value,
        } => {
            let workspace = cli.workspace()?;
            let definition = load_attribute(&stores, workspace, record, attribute).await?;
            let input = parse_input(definition.attribute_type, value)?;
            let change = ValueChange::new(
                attribute.clone(),
                encode_for(definition.attribute_type, &input)?,
            );
            stores
                .values
                .apply_change(workspace, &record.project, &record.issue, change)
                .await?;
            report_value(cli.json, &stores, &record.issue, &definition, out)
        }
        Command::Unset { record, attribute } => {
            let workspace = cli.workspace()?;
            let definition = load_attribute(&stores, workspace, record, attribute).await?;
            stores
                .values
                .delete_attribute_value(workspace, &record.project, &record.issue, attribute)
                .await?;
            report_value(cli.json, &stores, &record.issue, &definition, out)
        }
    }
}

fn print_types(json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    if json {
        let types: Vec<_> = AttributeType::ALL
            .iter()
            .map(|ty| {
                let meta = ty.meta();
                json!({ "type": ty.to_string(), "label": meta.label, "icon": meta.icon })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&types)?)?;
    } else {
        for ty in AttributeType::ALL {
            let meta = ty.meta();
            writeln!(out, "{:<14}{}", ty.to_string(), meta.label)?;
        }
    }
    Ok(())
}

fn print_entity(json: bool, entity: &AttributeDefinition, out: &mut impl Write) -> anyhow::Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(entity)?)?;
        return Ok(());
    }
    writeln!(out, "{} ({})", entity.display_name, entity.id)?;
    for attribute in entity.sorted_children() {
        let required = if attribute.is_required { " *" } else { "" };
        writeln!(
            out,
            "  {}\t{}\t{}{required}",
            attribute.id, attribute.attribute_type, attribute.display_name
        )?;
        for option in attribute.sorted_children() {
            let default = if option.is_default { " (default)" } else { "" };
            writeln!(out, "    - {}\t{}{default}", option.id, option.display_name)?;
        }
    }
    Ok(())
}

async fn load_attribute(
    stores: &AttributeStores,
    workspace: &str,
    record: &RecordArgs,
    attribute_id: &str,
) -> anyhow::Result<AttributeDefinition> {
    stores
        .definitions
        .fetch_entity_details(workspace, &record.entity)
        .await?;
    stores
        .values
        .fetch_issue_attribute_values(workspace, &record.project, &record.issue)
        .await?;
    stores
        .definitions
        .attribute(&record.entity, attribute_id)
        .with_context(|| format!("attribute {attribute_id} not found in entity {}", record.entity))
}

async fn load_controls(
    stores: &AttributeStores,
    workspace: &str,
    record: &RecordArgs,
) -> anyhow::Result<Vec<AttributeControl>> {
    stores
        .definitions
        .fetch_entity_details(workspace, &record.entity)
        .await?;
    stores
        .values
        .fetch_issue_attribute_values(workspace, &record.project, &record.issue)
        .await?;

    let mut controls = Vec::new();
    for definition in stores.definitions.entity_attributes(&record.entity) {
        if !definition.attribute_type.holds_value() {
            continue;
        }
        let stored = stores.values.value(&record.issue, &definition.id);
        match render(&definition, stored.as_deref()) {
            Ok(control) => controls.push(control),
            Err(err) => {
                tracing::warn!(attribute_id = %definition.id, error = %err, "skipping unreadable value");
            }
        }
    }
    Ok(controls)
}

fn report_value(
    json: bool,
    stores: &AttributeStores,
    record_id: &str,
    definition: &AttributeDefinition,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let stored = stores.values.value(record_id, &definition.id);
    let control = render(definition, stored.as_deref())?;
    print_controls(json, &[control], out)
}

fn print_controls(
    json: bool,
    controls: &[AttributeControl],
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if json {
        let rows: Vec<_> = controls
            .iter()
            .map(|control| {
                json!({
                    "attribute_id": control.attribute_id,
                    "type": control.attribute_type.to_string(),
                    "label": control.label,
                    "value": describe(control),
                })
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
    } else {
        for control in controls {
            writeln!(out, "{}\t{}", control.label, describe(control))?;
        }
    }
    Ok(())
}

/// One-line text form of a control's current value.
pub fn describe(control: &AttributeControl) -> String {
    let label_of = |id: &str, options: &[tracker_render::OptionChip]| {
        options
            .iter()
            .find(|chip| chip.id == id)
            .map_or_else(|| id.to_string(), |chip| chip.label.clone())
    };
    match &control.kind {
        ControlKind::Checkbox { checked, .. } => checked.to_string(),
        ControlKind::Datetime { display, value, .. } => display
            .clone()
            .or_else(|| value.map(|at| at.to_rfc3339()))
            .unwrap_or_default(),
        ControlKind::Number { value, display, .. } => {
            let number = value.map(|n| n.to_string()).unwrap_or_default();
            match display {
                NumberDisplay::Bar { ratio: Some(r) } | NumberDisplay::Ring { ratio: Some(r) } => {
                    format!("{number} ({:.0}%)", r * 100.0)
                }
                _ => number,
            }
        }
        ControlKind::Text { value, .. }
        | ControlKind::Relation { value, .. }
        | ControlKind::File { value, .. } => value.clone().unwrap_or_default(),
        ControlKind::Select { selected, options } => selected
            .as_deref()
            .map(|id| label_of(id, options))
            .unwrap_or_default(),
        ControlKind::MultiSelect { options } => options
            .iter()
            .filter(|chip| chip.selected)
            .map(|chip| chip.label.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracker_attributes::{AttributeValue, PropValue};
    use tracker_client::mock::MockAttributesApi;

    fn mock() -> Arc<MockAttributesApi> {
        let api = Arc::new(MockAttributesApi::new());
        let mut entity = AttributeDefinition::new("e1", AttributeType::Entity, "Bug");
        entity.project = Some("p1".to_string());
        let mut select = AttributeDefinition::new("s1", AttributeType::Select, "Severity");
        select.sort_order = 1.0;
        let mut high = AttributeDefinition::new("a", AttributeType::Option, "High");
        high.is_default = true;
        select.children = vec![high];
        let mut number = AttributeDefinition::new("n1", AttributeType::Number, "Effort");
        number.sort_order = 2.0;
        entity.children = vec![select, number];
        api.seed_definition(entity);
        api.seed_values(
            "p1",
            "i1",
            vec![AttributeValue::new("n1", vec![PropValue::scalar("3")])],
        );
        api
    }

    async fn run_args(api: Arc<MockAttributesApi>, args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("tracker").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        run(&cli, api, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn values_lists_rendered_attributes() {
        let out = run_args(
            mock(),
            &["-w", "acme", "values", "-p", "p1", "-i", "i1", "-e", "e1"],
        )
        .await
        .unwrap();
        assert_eq!(out, "Severity\tHigh\nEffort\t3\n");
    }

    #[tokio::test]
    async fn set_then_unset_round_trips_through_server() {
        let api = mock();
        let out = run_args(
            api.clone(),
            &["-w", "acme", "set", "-p", "p1", "-i", "i1", "-e", "e1", "-a", "n1", "8"],
        )
        .await
        .unwrap();
        assert_eq!(out, "Effort\t8\n");
        assert_eq!(
            api.server_values("p1", "i1"),
            vec![AttributeValue::new("n1", vec![PropValue::scalar("8")])]
        );

        run_args(
            api.clone(),
            &["-w", "acme", "unset", "-p", "p1", "-i", "i1", "-e", "e1", "-a", "n1"],
        )
        .await
        .unwrap();
        assert!(api.server_values("p1", "i1").is_empty());
    }

    #[tokio::test]
    async fn invalid_number_is_reported() {
        let err = run_args(
            mock(),
            &["-w", "acme", "set", "-p", "p1", "-i", "i1", "-e", "e1", "-a", "n1", "lots"],
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("invalid number"));
    }

    #[tokio::test]
    async fn unreadable_value_does_not_hide_the_rest() {
        let api = mock();
        let mut entity = api.definition("e1").unwrap();
        let mut due = AttributeDefinition::new("d1", AttributeType::Datetime, "Due");
        due.sort_order = 3.0;
        entity.children.push(due);
        api.seed_definition(entity);
        api.seed_values(
            "p1",
            "i1",
            vec![
                AttributeValue::new("n1", vec![PropValue::scalar("99999999999999999999")]),
                AttributeValue::new("d1", vec![PropValue::scalar("someday")]),
            ],
        );

        let out = run_args(api, &["-w", "acme", "values", "-p", "p1", "-i", "i1", "-e", "e1"])
            .await
            .unwrap();
        assert_eq!(out, "Severity\tHigh\nEffort\t9223372036854775807\n");
    }

    #[tokio::test]
    async fn missing_workspace_is_an_error() {
        let err = run_args(mock(), &["entities", "-p", "p1"]).await.unwrap_err();
        assert!(err.to_string().contains("workspace is required"));
    }
}
