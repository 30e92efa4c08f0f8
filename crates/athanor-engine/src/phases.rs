//! Phase handlers: the prompt template behavior of each pipeline stage
//!
//! Each handler turns the material produced by the previous phase (or the
//! raw input for the first phase) into a provider prompt. Handlers are
//! stateless; the orchestrator dispatches to them by phase value.

use athanor_models::{GenerationRequest, Phase};

use crate::classifier::classify;

/// Template behavior for one phase.
pub trait PhaseHandler: Send + Sync {
    /// The phase this handler implements.
    fn phase(&self) -> Phase;

    /// System prompt framing the provider call.
    fn system_prompt(&self) -> String;

    /// Build the provider prompt from the working material and request.
    fn render(&self, material: &str, request: &GenerationRequest) -> String;
}

/// Look up the handler for a phase.
#[must_use]
pub fn handler_for(phase: Phase) -> &'static dyn PhaseHandler {
    match phase {
        Phase::PrimaMateria => &PrimaMateria,
        Phase::Solutio => &Solutio,
        Phase::Coagulatio => &Coagulatio,
    }
}

const BASE_SYSTEM: &str = "You are a master alchemist of language, transforming raw ideas into \
                           golden prompts through ancient processes.";

fn append_context(content: &mut String, request: &GenerationRequest) {
    if !request.context.is_empty() {
        content.push_str("\n\nAdditional Context:\n");
        for line in &request.context {
            content.push_str("- ");
            content.push_str(line);
            content.push('\n');
        }
    }
    if let Some(persona) = &request.persona {
        content.push_str("\nPersona: ");
        content.push_str(persona);
        content.push('\n');
    }
}

/// Initial phase: extract and structure the raw request.
pub struct PrimaMateria;

impl PhaseHandler for PrimaMateria {
    fn phase(&self) -> Phase {
        Phase::PrimaMateria
    }

    fn system_prompt(&self) -> String {
        format!(
            "{BASE_SYSTEM} In this Prima Materia phase, analyze the raw request and forge it \
             into a comprehensive, well-structured prompt that clearly communicates intent and \
             requirements."
        )
    }

    fn render(&self, material: &str, request: &GenerationRequest) -> String {
        let classification = classify(material);
        let mut content = format!(
            "You are an expert prompt engineer. Create a comprehensive prompt that generates \
             {} for {}, using {}, focusing on {}.\n\n\
             Requirements:\n\
             - Be specific and detailed\n\
             - Include clear instructions\n\
             - Define expected output format\n\
             - Consider edge cases\n\n\
             User Input: {material}",
            classification.content_type,
            classification.audience,
            classification.tone,
            classification.theme,
        );
        append_context(&mut content, request);
        content
    }
}

/// Middle phase: dissolve structure into natural language.
pub struct Solutio;

impl PhaseHandler for Solutio {
    fn phase(&self) -> Phase {
        Phase::Solutio
    }

    fn system_prompt(&self) -> String {
        format!(
            "{BASE_SYSTEM} In this Solutio phase, dissolve rigid structures into flowing, \
             natural language that speaks to the human soul while maintaining clarity of \
             purpose."
        )
    }

    fn render(&self, material: &str, request: &GenerationRequest) -> String {
        let mut content = format!(
            "You are a linguistic alchemist performing Solutio - the dissolution phase. Take \
             this crystallized prompt and dissolve it into flowing, natural language that \
             resonates with the reader. Transform rigid structure into fluid conversation.\n\n\
             Material to Dissolve:\n{material}\n\n\
             Transformation Requirements:\n\
             - Dissolve formality into natural flow\n\
             - Infuse with emotional resonance\n\
             - Add the warmth of human connection\n\
             - Preserve the essential truth while softening edges"
        );
        append_context(&mut content, request);
        content
    }
}

/// Final phase: crystallize the refined form.
pub struct Coagulatio;

impl PhaseHandler for Coagulatio {
    fn phase(&self) -> Phase {
        Phase::Coagulatio
    }

    fn system_prompt(&self) -> String {
        format!(
            "{BASE_SYSTEM} In this Coagulatio phase, crystallize the dissolved essence into \
             its most potent form, achieving maximum effectiveness through perfect refinement."
        )
    }

    fn render(&self, material: &str, request: &GenerationRequest) -> String {
        let mut content = format!(
            "You are a master alchemist performing Coagulatio - the final crystallization. \
             Take this flowing prompt and crystallize it into its most potent, refined form. \
             Remove all impurities to reveal the philosopher's stone of prompts.\n\n\
             Solution to Crystallize:\n{material}\n\n\
             Crystallization Requirements:\n\
             - Distill to pure essence\n\
             - Remove all redundant matter\n\
             - Perfect the structural lattice\n\
             - Optimize for maximum potency"
        );
        append_context(&mut content, request);
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_lookup_matches_phase() {
        for phase in Phase::ALL {
            assert_eq!(handler_for(phase).phase(), phase);
        }
    }

    #[test]
    fn prima_materia_embeds_classification() {
        let request = GenerationRequest::new("write an email for business partners");
        let rendered = handler_for(Phase::PrimaMateria).render(&request.input, &request);
        assert!(rendered.contains("email content"));
        assert!(rendered.contains("business professionals"));
        assert!(rendered.contains(&request.input));
    }

    #[test]
    fn later_phases_carry_previous_material() {
        let request = GenerationRequest::new("original input");
        let rendered = handler_for(Phase::Solutio).render("previous phase output", &request);
        assert!(rendered.contains("previous phase output"));
        assert!(!rendered.contains("original input"));
    }

    #[test]
    fn context_lines_are_appended_as_bullets() {
        let mut request = GenerationRequest::new("input");
        request.context = vec!["constraint one".to_string(), "constraint two".to_string()];
        request.persona = Some("senior reviewer".to_string());

        let rendered = handler_for(Phase::Coagulatio).render("material", &request);
        assert!(rendered.contains("- constraint one"));
        assert!(rendered.contains("- constraint two"));
        assert!(rendered.contains("Persona: senior reviewer"));
    }
}
