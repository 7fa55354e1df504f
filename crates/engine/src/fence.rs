//! Fence selection for wrapping file content in prompts.

use contextfit_core::Fence;

/// Candidate fences, most preferred first.
pub const FENCES: &[(&str, &str)] = &[
    ("```", "```"),
    ("````", "````"),
    ("<source>", "</source>"),
    ("<code>", "</code>"),
    ("<pre>", "</pre>"),
    ("<codeblock>", "</codeblock>"),
    ("<sourcecode>", "</sourcecode>"),
];

/// The first fence whose opening marker begins no line of any content.
///
/// Falls back to the first fence when every candidate collides.
pub fn choose_fence<'a>(contents: impl IntoIterator<Item = &'a str>) -> Fence {
    let contents: Vec<&str> = contents.into_iter().collect();
    let collides = |open: &str| {
        contents
            .iter()
            .flat_map(|content| content.lines())
            .any(|line| line.starts_with(open))
    };

    let (open, close) = FENCES
        .iter()
        .find(|(open, _)| !collides(open))
        .unwrap_or(&FENCES[0]);
    Fence::new(*open, *close)
}
