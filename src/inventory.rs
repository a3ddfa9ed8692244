//! Inventory declarations
//!
//! An inventory is declared with flags, a TOML file, or both. Flags win over
//! the file field by field. Anything left undeclared is left alone on the
//! server.
//!
//! ```toml
//! name = "Web servers"
//! organization = "Default"
//! description = "Production web tier"
//! instance_groups = ["geneva", "tokyo"]
//!
//! [variables]
//! ansible_user = "deploy"
//! ```

use crate::cli::InventoryArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use declarative::{DesiredState, FieldValue, Kind, Reference, ResourceDescriptor, Scope, Slot};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

pub const COLLECTION: &str = "inventories";
const SMART: &str = "smart";

/// Declared state of one inventory, before validation
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InventorySpec {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub description: Option<String>,
    /// A table, or a JSON/YAML mapping in a string
    pub variables: Option<Value>,
    pub variables_file: Option<String>,
    pub kind: Option<String>,
    pub host_filter: Option<String>,
    pub insights_credential: Option<String>,
    pub instance_groups: Option<Vec<String>>,
    pub copy_from: Option<String>,
    pub state: Option<DesiredState>,
}

impl InventorySpec {
    /// Parse a declaration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid inventory declaration in {}", path.display()))
    }

    /// Build from flags, reading `--file` first when given
    pub fn from_args(args: &InventoryArgs) -> Result<Self> {
        let base = match &args.file {
            Some(file) => Self::load(&paths::expand(file))?,
            None => Self::default(),
        };
        base.merge(args)
    }

    /// Override fields with the ones set on the command line
    pub fn merge(mut self, args: &InventoryArgs) -> Result<Self> {
        fn set(slot: &mut Option<String>, flag: Option<&String>) {
            if let Some(value) = flag {
                *slot = Some(value.clone());
            }
        }

        set(&mut self.name, args.name.as_ref());
        set(&mut self.organization, args.organization.as_ref());
        set(&mut self.description, args.description.as_ref());
        set(&mut self.kind, args.kind.as_ref());
        set(&mut self.host_filter, args.host_filter.as_ref());
        set(&mut self.insights_credential, args.insights_credential.as_ref());
        set(&mut self.copy_from, args.copy_from.as_ref());

        if let Some(text) = &args.variables {
            self.variables = Some(Value::String(text.clone()));
            self.variables_file = None;
        }
        if let Some(file) = &args.variables_file {
            self.variables_file = Some(file.clone());
            self.variables = None;
        }
        if args.no_instance_groups {
            self.instance_groups = Some(Vec::new());
        } else if !args.instance_groups.is_empty() {
            self.instance_groups = Some(args.instance_groups.clone());
        }
        if let Some(state) = args.state {
            self.state = Some(state.into());
        }
        Ok(self)
    }

    /// Validate and turn into a descriptor the reconciler understands
    pub fn to_descriptor(&self) -> Result<ResourceDescriptor> {
        let name = required(self.name.as_deref(), "name")?;
        let organization = required(self.organization.as_deref(), "organization")?;

        let variables = match (&self.variables, &self.variables_file) {
            (Some(_), Some(_)) => bail!("Declare either variables or variables_file, not both"),
            (Some(value), None) => Some(variables_from_value(value)?),
            (None, Some(file)) => Some(variables_from_file(&paths::expand(file))?),
            (None, None) => None,
        };

        let text = |value: &Option<String>| -> Slot<FieldValue> {
            value.as_deref().map(FieldValue::text).into()
        };

        Ok(ResourceDescriptor::new(
            COLLECTION,
            "inventory",
            name,
            Scope::new("organization", "organizations", organization),
        )
        .state(self.state.unwrap_or_default())
        .kind(parse_kind(self.kind.as_deref())?)
        .copy_from(self.copy_from.clone())
        .field("description", text(&self.description))
        .field("variables", variables.map(FieldValue::Structured).into())
        .field("host_filter", text(&self.host_filter))
        .field(
            "insights_credential",
            self.insights_credential
                .as_deref()
                .map(|c| FieldValue::Reference(Reference::new("credentials", c)))
                .into(),
        )
        .association(
            "instance_groups",
            "instance_groups",
            self.instance_groups.clone().into(),
        ))
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("Missing required field: {field}"),
    }
}

/// `""` and `regular` mean the default kind
pub fn parse_kind(kind: Option<&str>) -> Result<Kind> {
    match kind.map(str::trim) {
        None | Some("" | "regular") => Ok(Kind::default()),
        Some(SMART) => Ok(Kind::new(SMART)),
        Some(other) => bail!("Unknown inventory kind '{other}' (expected \"\" or \"smart\")"),
    }
}

/// Parse variables written as JSON or YAML
///
/// Empty input means no variables.
pub fn parse_variables(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value =
        serde_yaml::from_str(text).context("Variables are neither valid JSON nor YAML")?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => bail!("Variables must be a mapping"),
    }
}

fn variables_from_value(value: &Value) -> Result<Value> {
    match value {
        Value::String(text) => parse_variables(text),
        Value::Object(_) => Ok(value.clone()),
        _ => bail!("Variables must be a table or a JSON/YAML string"),
    }
}

fn variables_from_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read variables file {}", path.display()))?;
    parse_variables(&content).with_context(|| format!("Invalid variables in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StateArg;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn args(name: &str, organization: &str) -> InventoryArgs {
        InventoryArgs {
            name: Some(name.into()),
            organization: Some(organization.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_declaration() {
        let desired = InventorySpec::from_args(&args("Foo", "Bar"))
            .unwrap()
            .to_descriptor()
            .unwrap();

        assert_eq!(desired.collection, "inventories");
        assert_eq!(desired.name, "Foo");
        assert_eq!(desired.scope.name_or_id, "Bar");
        assert!(desired.state.is_present());
        assert!(desired.kind.is_default());
        assert!(desired.fields.iter().all(|(_, slot)| !slot.is_provided()));
        assert!(desired.associations.is_empty());
    }

    #[test]
    fn test_missing_name_is_error() {
        let spec = InventorySpec {
            organization: Some("Bar".into()),
            ..Default::default()
        };
        let err = spec.to_descriptor().unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_blank_organization_is_error() {
        let err = InventorySpec::from_args(&args("Foo", "  "))
            .unwrap()
            .to_descriptor()
            .unwrap_err();
        assert!(err.to_string().contains("organization"));
    }

    #[test]
    fn test_parse_kind() {
        assert!(parse_kind(None).unwrap().is_default());
        assert!(parse_kind(Some("")).unwrap().is_default());
        assert!(parse_kind(Some("regular")).unwrap().is_default());
        assert_eq!(parse_kind(Some("smart")).unwrap().as_str(), "smart");
        assert!(parse_kind(Some("constructed")).is_err());
    }

    #[test]
    fn test_parse_variables_json_and_yaml() {
        assert_eq!(
            parse_variables(r#"{"a": 1}"#).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            parse_variables("---\na: 1\nb: [x, y]\n").unwrap(),
            json!({"a": 1, "b": ["x", "y"]})
        );
        assert_eq!(parse_variables("").unwrap(), json!({}));
        assert!(parse_variables("- just\n- a list\n").is_err());
    }

    #[test]
    fn test_file_declaration_with_flag_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.toml");
        fs::write(
            &path,
            r#"
name = "Web"
organization = "Default"
description = "from file"
instance_groups = ["geneva"]

[variables]
ansible_user = "deploy"
"#,
        )
        .unwrap();

        let flags = InventoryArgs {
            file: Some(path.to_string_lossy().into_owned()),
            description: Some("from flag".into()),
            ..Default::default()
        };
        let desired = InventorySpec::from_args(&flags)
            .unwrap()
            .to_descriptor()
            .unwrap();

        assert_eq!(desired.name, "Web");
        assert!(matches!(
            desired.slot("description"),
            Slot::Provided(FieldValue::Plain(v)) if *v == json!("from flag")
        ));
        assert!(matches!(
            desired.slot("variables"),
            Slot::Provided(FieldValue::Structured(v)) if *v == json!({"ansible_user": "deploy"})
        ));
        assert_eq!(
            desired.associations["instance_groups"].references,
            vec!["geneva".to_string()]
        );
    }

    #[test]
    fn test_variables_file() {
        let dir = TempDir::new().unwrap();
        let vars = dir.path().join("vars.yml");
        fs::write(&vars, "env: prod\n").unwrap();

        let mut flags = args("Foo", "Bar");
        flags.variables_file = Some(vars.to_string_lossy().into_owned());
        let desired = InventorySpec::from_args(&flags)
            .unwrap()
            .to_descriptor()
            .unwrap();

        assert!(matches!(
            desired.slot("variables"),
            Slot::Provided(FieldValue::Structured(v)) if *v == json!({"env": "prod"})
        ));
    }

    #[test]
    fn test_no_instance_groups_declares_empty_set() {
        let mut flags = args("Foo", "Bar");
        flags.no_instance_groups = true;
        let desired = InventorySpec::from_args(&flags)
            .unwrap()
            .to_descriptor()
            .unwrap();
        assert!(desired.associations["instance_groups"].references.is_empty());
    }

    #[test]
    fn test_references_and_state() {
        let mut flags = args("Foo", "Bar");
        flags.insights_credential = Some("insights".into());
        flags.copy_from = Some("Template".into());
        flags.state = Some(StateArg::Absent);
        let desired = InventorySpec::from_args(&flags)
            .unwrap()
            .to_descriptor()
            .unwrap();

        assert!(desired.state.is_absent());
        assert_eq!(desired.copy_from.as_deref(), Some("Template"));
        assert!(matches!(
            desired.slot("insights_credential"),
            Slot::Provided(FieldValue::Reference(r)) if r.collection == "credentials"
        ));
    }

    #[test]
    fn test_unknown_file_key_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.toml");
        fs::write(&path, "name = \"x\"\norganisation = \"typo\"\n").unwrap();
        assert!(InventorySpec::load(&path).is_err());
    }
}
