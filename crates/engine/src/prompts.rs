//! Persona prompts for each interaction kind.
//!
//! Templates may use `{fence}` / `{fence_close}` (the chosen fence markers)
//! and `{platform}` (a short description of the host system).

use contextfit_core::{Fence, InteractionKind};

/// The prompt pair for one persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub kind: InteractionKind,
    pub main_system: &'static str,
    pub system_reminder: &'static str,
}

const ASK: Persona = Persona {
    kind: InteractionKind::Ask,
    main_system: "Act as an expert code analyst.\n\
Answer questions about the supplied code.\n\
Always reply to the user in the same language they are using.\n\
If you need to describe code changes, do so briefly; do not rewrite files.\n\
{platform}",
    system_reminder: "Quote code from the files with {fence} and {fence_close} markers.\n\
Do not propose full-file rewrites in this mode.",
};

const ARCHITECT: Persona = Persona {
    kind: InteractionKind::Architect,
    main_system: "Act as an expert architect engineer and provide direction to your editor engineer.\n\
Study the change request and the current code.\n\
Describe how to modify the code to complete the request.\n\
The editor engineer will rely solely on your instructions, so make them unambiguous and complete.\n\
Explain all needed code changes clearly and completely, but concisely.\n\
Just show the changes needed.\n\
{platform}",
    system_reminder: "Do not show entire updated files. Only show the parts that change, \
wrapped in {fence} and {fence_close} markers.",
};

const CODE: Persona = Persona {
    kind: InteractionKind::Code,
    main_system: "Act as an expert software developer.\n\
Always use best practices when coding.\n\
Respect and use existing conventions, libraries, etc that are already present in the code base.\n\
Take requests for changes to the supplied code.\n\
If the request is ambiguous, ask questions.\n\
{platform}",
    system_reminder: "Every change must name the file path on its own line, followed by the \
complete updated code wrapped in {fence} and {fence_close} markers.\n\
Only edit files that have been added to the chat as editable.",
};

impl Persona {
    /// The persona for `kind`.
    pub fn for_kind(kind: InteractionKind) -> Self {
        match kind {
            InteractionKind::Ask => ASK,
            InteractionKind::Architect => ARCHITECT,
            InteractionKind::Code => CODE,
        }
    }

    /// Main system prompt with placeholders filled.
    pub fn render_main(&self, fence: &Fence) -> String {
        render(self.main_system, fence, &platform())
    }

    /// System reminder with placeholders filled.
    pub fn render_reminder(&self, fence: &Fence) -> String {
        render(self.system_reminder, fence, &platform())
    }
}

/// Fill `{fence}`, `{fence_close}` and `{platform}` in `template`.
pub fn render(template: &str, fence: &Fence, platform: &str) -> String {
    template
        .replace("{fence_close}", &fence.close)
        .replace("{fence}", &fence.open)
        .replace("{platform}", platform)
}

/// Host description included in system prompts.
pub fn platform() -> String {
    format!(
        "- Platform: {}-{}\n- Shell: {}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        std::env::var("SHELL").unwrap_or_else(|_| "unknown".into())
    )
}
