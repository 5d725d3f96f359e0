//! `fahrplan create` command: create a plan from a template and initial
//! facts.

use anyhow::{Context, Result};

use fahrplan_engine::EngineClient;

/// Parse `key=value` pairs into a fact map. Values are stored as JSON
/// strings; the engine coerces types template-side.
fn parse_facts(pairs: &[String]) -> Result<serde_json::Map<String, serde_json::Value>> {
    let mut facts = serde_json::Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid fact {pair:?}; expected key=value"))?;
        facts.insert(
            key.to_string(),
            serde_json::Value::String(value.to_string()),
        );
    }
    Ok(facts)
}

/// Run the create command.
pub async fn run_create(
    client: &EngineClient,
    template: &str,
    fact_pairs: &[String],
) -> Result<()> {
    let facts = parse_facts(fact_pairs)?;
    let plan = client
        .create_plan(template, facts)
        .await
        .with_context(|| format!("failed to create plan from template {template:?}"))?;

    println!("Plan created: {}", plan.id);
    println!("  template = {}", plan.template_key);
    println!("  status = {}", plan.status);
    println!();
    println!("Next: run `fahrplan tasks {}` to see the task list.", plan.id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_facts_accepts_key_value_pairs() {
        let facts = parse_facts(&[
            "due_date=2024-09-01".to_string(),
            "bundesland=berlin".to_string(),
        ])
        .unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(
            facts.get("bundesland"),
            Some(&serde_json::Value::String("berlin".to_string()))
        );
    }

    #[test]
    fn parse_facts_rejects_missing_separator() {
        let err = parse_facts(&["bundesland".to_string()]).unwrap_err();
        assert!(err.to_string().contains("expected key=value"));
    }

    #[test]
    fn parse_facts_keeps_equals_in_value() {
        let facts = parse_facts(&["note=a=b".to_string()]).unwrap();
        assert_eq!(
            facts.get("note"),
            Some(&serde_json::Value::String("a=b".to_string()))
        );
    }
}
