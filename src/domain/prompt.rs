//! Prompt construction for the three generation roles.
//!
//! Every turn makes up to three kinds of generation calls: the persona draft,
//! the consistency judge, and the refiner. This module builds the system
//! prompts for all three from the turn's persona configuration. The literal
//! wording is configuration-grade, not contractual; the structure (which
//! persona fields are embedded where) is what the pipeline relies on.

use super::persona::PersonaConfig;
use super::policy::{Violation, CLEAN_SENTINEL};
use super::turn::{AttemptHistory, Turn};

/// How a refinement attempt should approach the rejected draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementStrategy {
    /// Minimally edit the prior draft to remove the reported problems.
    ReviseLastDraft,
    /// Discard the prior draft and regenerate from the persona's facts alone.
    RegenerateFromFacts,
}

impl RefinementStrategy {
    /// Strategy table keyed by attempt index (1-based): attempts at or past
    /// `aggressive_after` stop editing and regenerate from facts.
    pub fn for_attempt(attempt: u32, aggressive_after: u32) -> Self {
        if attempt >= aggressive_after {
            RefinementStrategy::RegenerateFromFacts
        } else {
            RefinementStrategy::ReviseLastDraft
        }
    }
}

/// Builds system prompts for the persona, judge, and refiner roles.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// Name of the investigator persona, whose lines are inner monologue.
    investigator_name: String,
    /// Number of recent exchanges embedded in the judge prompt.
    context_exchanges: usize,
}

impl PromptBuilder {
    /// Creates a builder.
    pub fn new(investigator_name: impl Into<String>, context_exchanges: usize) -> Self {
        Self {
            investigator_name: investigator_name.into(),
            context_exchanges,
        }
    }

    /// True if `persona` is the investigator.
    pub fn is_investigator(&self, persona: &PersonaConfig) -> bool {
        persona.name == self.investigator_name
    }

    /// System prompt for the initial persona draft: the global story followed
    /// by the persona template. The investigator gets the self-reflection
    /// template (their lines are inner monologue); everyone else gets the
    /// interrogation template.
    pub fn system_prompt(&self, turn: &Turn) -> String {
        let persona = &turn.persona;
        if self.is_investigator(persona) {
            format!(
                "{story} {name} is investigating the case. The text above is the story's \
                 background. You are {name}, thinking to yourself as you work the case. \
                 Your core personality: {personality}. Your background and relationships: \
                 {bio}. What you currently know about today's events: {facts}. Every \
                 'user' message is a question {name} poses to themselves; every \
                 'assistant' message is {name}'s own answer. All of your output must be \
                 {name}'s inner monologue in the first person. Never use parentheses, \
                 stage directions, emoji, or action descriptions. Stay fully in \
                 character; you may invent details consistent with the setting, but \
                 never contradict it.",
                story = turn.global_story,
                name = persona.name,
                personality = persona.personality,
                bio = persona.bio,
                facts = persona.known_facts,
            )
        } else {
            format!(
                "{story} {investigator} is interrogating suspects to find the culprit. \
                 The text above is the story's background. You are {name}, speaking with \
                 {investigator}. Your core personality: {personality}. Your background \
                 and relationships: {bio}. What you know (or are willing to reveal) \
                 about today's events: {facts}. The line you must never cross: {secret} \
                 (never volunteer it unless cornered in an extreme confrontation). All \
                 of your output must be pure dialogue, the words {name} speaks aloud. \
                 Never use parentheses, narration, emoji, or action descriptions. Stay \
                 fully in character; when questions touch your secret you may deflect, \
                 lie, or change the subject, but your reaction must fit the character. \
                 You may invent details consistent with the setting, but never \
                 contradict it.",
                story = turn.global_story,
                investigator = self.investigator_name,
                name = persona.name,
                personality = persona.personality,
                bio = persona.bio,
                facts = persona.known_facts,
                secret = persona.secret,
            )
        }
    }

    /// System prompt for the consistency judge.
    ///
    /// Embeds the candidate line, the persona's known facts, the
    /// persona-specific prohibited behaviors, and the most recent exchanges so
    /// the judge can disambiguate elliptical references.
    pub fn judge_prompt(&self, persona: &PersonaConfig, candidate: &str) -> String {
        let mut principles = String::from(
            "Principle A: the line contradicts facts the character knows.",
        );
        if persona.has_violation_rules() {
            principles.push('\n');
            principles.push_str(persona.violation_rules.trim());
        }

        let context = persona
            .recent_exchanges(self.context_exchanges)
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Check whether {name}'s latest line: \"{candidate}\" seriously violates any \
             of the following principles: {principles} End of principles.\n\n\
             Character sheet (the facts {name} knows): {facts}\n\n\
             Recent conversation, for resolving references only:\n{context}\n\n\
             Focus only on the latest line, not earlier parts of the conversation. \
             Identify clear violations of the principles above. Off-topic conversation \
             is allowed. Consult only the principles and the character sheet; ignore \
             everything else. Provide a concise explanation of fewer than 100 words, \
             quoting the latest line directly for each violation. Think step by step \
             before listing violated principles. If no principle is violated, return \
             exactly the word \"{sentinel}\" and nothing else. Otherwise, after your \
             analysis, list the violations in this format:\n\
             Format: Quote: ... Critique: ... Violated principle: ...\n\
             Example: Quote: \"{name} is saying nice things.\" Critique: the line is in \
             the third person. Violated principle: Principle 2: the dialogue is not from \
             {name}'s perspective.",
            name = persona.name,
            candidate = candidate,
            principles = principles,
            facts = persona.known_facts,
            context = context,
            sentinel = CLEAN_SENTINEL,
        )
    }

    /// System prompt for a refinement attempt.
    ///
    /// Conditions on the original player message, the persona's facts and
    /// secret, the verdict's explanation, and every previously rejected draft
    /// (which the refiner is told not to repeat). The strategy escalates at
    /// high attempt counts: late attempts regenerate from the character sheet
    /// instead of editing the rejected text.
    pub fn refiner_prompt(
        &self,
        persona: &PersonaConfig,
        original_message: &str,
        violation: &Violation,
        history: &AttemptHistory,
        strategy: RefinementStrategy,
    ) -> String {
        let mut prompt = format!(
            "Your job is to edit dialogue for a murder-mystery game. The line comes \
             from the character {name}, responding to this prompt: {original_message} \
             This is {name}'s story background: {facts} {secret} \
             Your revised line must be consistent with the story background and free of \
             the following problems: {problems}. \
             The revised line must be written from {name}'s perspective and fit \
             {name}'s personality: {personality}.",
            name = persona.name,
            original_message = original_message,
            facts = persona.known_facts,
            secret = persona.secret,
            problems = violation.explanation,
            personality = persona.personality,
        );

        if !history.is_empty() {
            prompt.push_str(
                " The following earlier versions were already rejected; do not repeat \
                 their phrasing:",
            );
            for (i, text) in history.texts().iter().enumerate() {
                prompt.push_str(&format!(" Rejected version {}: \"{}\".", i + 1, text));
            }
        }

        match strategy {
            RefinementStrategy::ReviseLastDraft => prompt.push_str(
                " Change as little of the original input as possible!",
            ),
            RefinementStrategy::RegenerateFromFacts => prompt.push_str(
                " Do not edit the rejected text. Write a fresh line grounded only in \
                 the character sheet above.",
            ),
        }

        prompt.push_str(
            " Omit all of the following from your output: quotation marks, commentary \
             about story consistency, and any mention of principles or violations.",
        );

        prompt
    }
}
