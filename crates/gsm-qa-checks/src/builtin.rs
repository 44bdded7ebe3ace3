//! Built-in checks
//!
//! A small battery of structural checks grouped in three modules:
//! `basic`, `annotation` and `consistency`. Each reports the offending
//! identifiers as data and the fraction of offenders as metric.

use serde_json::{Value, json};

use crate::check::{
    CheckDescriptor, CheckError, CheckOutcome, CheckRegistry, CheckResult, FnCheck, FormatType,
};
use crate::error::Result;
use crate::model::Model;

/// Module name of the basic checks
pub const BASIC: &str = "basic";
/// Module name of the annotation checks
pub const ANNOTATION: &str = "annotation";
/// Module name of the consistency checks
pub const CONSISTENCY: &str = "consistency";

/// Build a registry holding every built-in check
///
/// # Errors
///
/// Returns an error if two built-in checks share an identifier.
pub fn builtin_registry() -> Result<CheckRegistry> {
    let mut registry = CheckRegistry::new();
    register_builtin(&mut registry)?;
    Ok(registry)
}

/// Register every built-in check into an existing registry
///
/// # Errors
///
/// Returns an error if an identifier is already registered.
pub fn register_builtin(registry: &mut CheckRegistry) -> Result<()> {
    registry.register(FnCheck::new(
        CheckDescriptor::new("test_model_id_presence", BASIC, "Model Identifier")
            .with_summary("Expect that the model has an identifier.")
            .with_format(FormatType::Raw),
        model_id_presence,
    ))?;
    registry.register(FnCheck::new(
        CheckDescriptor::new("test_metabolites_presence", BASIC, "Total Metabolites")
            .with_summary("Expect that at least one metabolite is defined.")
            .with_format(FormatType::Number),
        metabolites_presence,
    ))?;
    registry.register(FnCheck::new(
        CheckDescriptor::new("test_reactions_presence", BASIC, "Total Reactions")
            .with_summary("Expect that at least one reaction is defined.")
            .with_format(FormatType::Number),
        reactions_presence,
    ))?;
    registry.register(FnCheck::new(
        CheckDescriptor::new("test_genes_presence", BASIC, "Total Genes")
            .with_summary("Expect that at least one gene is defined.")
            .with_format(FormatType::Number),
        genes_presence,
    ))?;
    registry.register(FnCheck::new(
        CheckDescriptor::new(
            "test_metabolites_formula_presence",
            BASIC,
            "Metabolites without Formula",
        )
        .with_summary("Expect all metabolites to have a chemical formula.")
        .with_format(FormatType::Count),
        metabolites_formula_presence,
    ))?;
    registry.register(FnCheck::new(
        CheckDescriptor::new(
            "test_metabolites_charge_presence",
            BASIC,
            "Metabolites without Charge",
        )
        .with_summary("Expect all metabolites to have a formal charge.")
        .with_format(FormatType::Count),
        metabolites_charge_presence,
    ))?;
    registry.register(FnCheck::new(
        CheckDescriptor::new(
            "test_gene_protein_reaction_rule_presence",
            BASIC,
            "Missing Gene-Protein-Reaction (GPR) Associations",
        )
        .with_summary("Expect all non-boundary reactions to carry a GPR rule.")
        .with_format(FormatType::Count),
        gene_protein_reaction_rule_presence,
    ))?;
    registry.register(
        FnCheck::new(
            CheckDescriptor::new(
                "test_metabolites_presence_in_compartment",
                BASIC,
                "Metabolites per Compartment",
            )
            .with_summary("Expect every compartment to contain at least one metabolite.")
            .with_format(FormatType::Count),
            metabolites_presence_in_compartment,
        )
        .parametrized(Model::compartment_ids),
    )?;
    registry.register(FnCheck::new(
        CheckDescriptor::new(
            "test_metabolite_annotation_presence",
            ANNOTATION,
            "Presence of Metabolite Annotation",
        )
        .with_summary("Expect all metabolites to have a non-empty annotation.")
        .with_format(FormatType::Count),
        metabolite_annotation_presence,
    ))?;
    registry.register(FnCheck::new(
        CheckDescriptor::new(
            "test_reaction_annotation_presence",
            ANNOTATION,
            "Presence of Reaction Annotation",
        )
        .with_summary("Expect all reactions to have a non-empty annotation.")
        .with_format(FormatType::Count),
        reaction_annotation_presence,
    ))?;
    registry.register(FnCheck::new(
        CheckDescriptor::new(
            "test_reaction_bounds_consistency",
            CONSISTENCY,
            "Reaction Bounds Consistency",
        )
        .with_summary("Expect every lower flux bound to be at most its upper bound.")
        .with_format(FormatType::Count)
        .with_weight(2.0),
        reaction_bounds_consistency,
    ))?;
    Ok(())
}

/// Fraction of offenders among `total` entities
fn ratio(offenders: &[String], total: usize, what: &str) -> std::result::Result<f64, CheckError> {
    if total == 0 {
        return Err(CheckError::new(format!("The model has no {what}.")));
    }
    Ok(offenders.len() as f64 / total as f64)
}

fn offenders_outcome(offenders: Vec<String>, total: usize, what: &str, problem: &str) -> CheckResult {
    let metric = ratio(&offenders, total, what)?;
    let message = format!(
        "{} of {total} {what} {problem}{}",
        offenders.len(),
        if offenders.is_empty() {
            String::new()
        } else {
            format!(": {}", offenders.join(", "))
        }
    );
    Ok(CheckOutcome::from_metric(json!(offenders), metric, message))
}

fn presence(count: usize, what: &str) -> CheckOutcome {
    let metric = if count > 0 { 0.0 } else { 1.0 };
    CheckOutcome::from_metric(json!(count), metric, format!("{count} {what} are defined."))
}

fn model_id_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    let id = model.id.clone().unwrap_or_default();
    Ok(if id.is_empty() {
        CheckOutcome::failed(Value::String(id), 1.0, "The model has no identifier.")
    } else {
        let message = format!("The model identifier is '{id}'.");
        CheckOutcome::passed(Value::String(id), 0.0, message)
    })
}

fn metabolites_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    Ok(presence(model.metabolites.len(), "metabolites"))
}

fn reactions_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    Ok(presence(model.reactions.len(), "reactions"))
}

fn genes_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    Ok(presence(model.genes.len(), "genes"))
}

fn metabolites_formula_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    let missing = model
        .metabolites
        .iter()
        .filter(|m| m.formula.as_deref().is_none_or(str::is_empty))
        .map(|m| m.id.clone())
        .collect();
    offenders_outcome(missing, model.metabolites.len(), "metabolites", "lack a formula")
}

fn metabolites_charge_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    let missing = model
        .metabolites
        .iter()
        .filter(|m| m.charge.is_none())
        .map(|m| m.id.clone())
        .collect();
    offenders_outcome(missing, model.metabolites.len(), "metabolites", "lack a charge")
}

fn gene_protein_reaction_rule_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    let internal: Vec<_> = model.reactions.iter().filter(|r| !r.is_boundary()).collect();
    let missing = internal
        .iter()
        .filter(|r| r.gene_reaction_rule.trim().is_empty())
        .map(|r| r.id.clone())
        .collect();
    offenders_outcome(missing, internal.len(), "non-boundary reactions", "lack a GPR rule")
}

fn metabolites_presence_in_compartment(model: &Model, param: Option<&str>) -> CheckResult {
    let compartment =
        param.ok_or_else(|| CheckError::new("A compartment parameter is required."))?;
    let found: Vec<String> = model
        .metabolites_in(compartment)
        .into_iter()
        .map(|m| m.id.clone())
        .collect();
    let metric = if found.is_empty() { 1.0 } else { 0.0 };
    let message = format!(
        "Compartment '{compartment}' contains {} metabolites.",
        found.len()
    );
    Ok(CheckOutcome::from_metric(json!(found), metric, message))
}

fn metabolite_annotation_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    let missing = model
        .metabolites
        .iter()
        .filter(|m| m.annotation.is_empty())
        .map(|m| m.id.clone())
        .collect();
    offenders_outcome(missing, model.metabolites.len(), "metabolites", "lack annotation")
}

fn reaction_annotation_presence(model: &Model, _param: Option<&str>) -> CheckResult {
    let missing = model
        .reactions
        .iter()
        .filter(|r| r.annotation.is_empty())
        .map(|r| r.id.clone())
        .collect();
    offenders_outcome(missing, model.reactions.len(), "reactions", "lack annotation")
}

fn reaction_bounds_consistency(model: &Model, _param: Option<&str>) -> CheckResult {
    let inconsistent = model
        .reactions
        .iter()
        .filter(|r| r.lower_bound > r.upper_bound || r.lower_bound.is_nan() || r.upper_bound.is_nan())
        .map(|r| r.id.clone())
        .collect();
    offenders_outcome(
        inconsistent,
        model.reactions.len(),
        "reactions",
        "have inconsistent bounds",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Check;
    use crate::model::{Gene, Metabolite, Reaction};

    fn toy_model() -> Model {
        let mut model = Model::new("toy");
        model.add_metabolite(Metabolite::new("glc__D_e", "e").with_formula("C6H12O6").with_charge(0));
        model.add_metabolite(Metabolite::new("glc__D_c", "c"));
        model.add_reaction(Reaction::new("EX_glc__D_e", &[("glc__D_e", -1.0)]).with_bounds(-10.0, 1000.0));
        model.add_reaction(
            Reaction::new("GLCt", &[("glc__D_e", -1.0), ("glc__D_c", 1.0)]).with_gene_rule("b0001"),
        );
        model.add_reaction(Reaction::new("BAD", &[("glc__D_c", -1.0), ("glc__D_e", 1.0)]).with_bounds(5.0, 1.0));
        model.add_gene(Gene::new("b0001"));
        model
    }

    fn evaluate(id: &str, model: &Model, param: Option<&str>) -> CheckResult {
        let registry = builtin_registry().expect("registry");
        let check = registry.get(id).expect("registered");
        check.evaluate(model, param)
    }

    #[test]
    fn test_builtin_registry_is_complete() {
        let registry = builtin_registry().expect("registry");
        assert_eq!(registry.len(), 11);
        assert!(registry.descriptors().iter().all(|d| !d.title.is_empty()));
    }

    #[test]
    fn test_register_builtin_twice_fails() {
        let mut registry = builtin_registry().expect("registry");
        assert!(register_builtin(&mut registry).is_err());
    }

    #[test]
    fn test_model_id_presence() {
        let outcome = evaluate("test_model_id_presence", &toy_model(), None).expect("ok");
        assert!(outcome.passed);
        assert_eq!(outcome.data, json!("toy"));

        let outcome = evaluate("test_model_id_presence", &Model::default(), None).expect("ok");
        assert!(!outcome.passed);
        assert_eq!(outcome.metric, 1.0);
    }

    #[test]
    fn test_presence_counts() {
        let model = toy_model();
        let outcome = evaluate("test_reactions_presence", &model, None).expect("ok");
        assert_eq!(outcome.data, json!(3));
        assert_eq!(outcome.metric, 0.0);
        let outcome = evaluate("test_genes_presence", &Model::default(), None).expect("ok");
        assert_eq!(outcome.metric, 1.0);
    }

    #[test]
    fn test_formula_presence_metric() {
        let outcome =
            evaluate("test_metabolites_formula_presence", &toy_model(), None).expect("ok");
        assert_eq!(outcome.data, json!(["glc__D_c"]));
        assert!((outcome.metric - 0.5).abs() < f64::EPSILON);
        assert!(!outcome.passed);
    }

    #[test]
    fn test_formula_presence_empty_model_errors() {
        let err = evaluate("test_metabolites_formula_presence", &Model::default(), None)
            .expect_err("no metabolites");
        assert!(err.to_string().contains("no metabolites"));
    }

    #[test]
    fn test_gpr_ignores_boundary_reactions() {
        let outcome =
            evaluate("test_gene_protein_reaction_rule_presence", &toy_model(), None).expect("ok");
        assert_eq!(outcome.data, json!(["BAD"]));
        assert!((outcome.metric - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compartment_parameters() {
        let registry = builtin_registry().expect("registry");
        let check = registry
            .get("test_metabolites_presence_in_compartment")
            .expect("registered");
        let model = toy_model();
        assert_eq!(
            check.parameters(&model).expect("parametrized"),
            vec!["e".to_string(), "c".to_string()]
        );
        let outcome = check.evaluate(&model, Some("c")).expect("ok");
        assert!(outcome.passed);
        let outcome = check.evaluate(&model, Some("p")).expect("ok");
        assert_eq!(outcome.metric, 1.0);
        assert!(check.evaluate(&model, None).is_err());
    }

    #[test]
    fn test_bounds_consistency() {
        let outcome =
            evaluate("test_reaction_bounds_consistency", &toy_model(), None).expect("ok");
        assert_eq!(outcome.data, json!(["BAD"]));
        assert!(!outcome.passed);
        let registry = builtin_registry().expect("registry");
        assert_eq!(
            registry
                .descriptor("test_reaction_bounds_consistency")
                .expect("found")
                .weight_default,
            2.0
        );
    }

    #[test]
    fn test_annotation_presence() {
        let outcome =
            evaluate("test_reaction_annotation_presence", &toy_model(), None).expect("ok");
        assert_eq!(outcome.metric, 1.0);
    }
}
