//! Instruction text sent with every transform and extraction request.
//!
//! All builders are pure. The structural elements in [`PROTECTED_ELEMENTS`]
//! are rendered identically into every generation prompt.

use roomcraft_contracts::catalog::Palette;

/// Room elements a generation must never alter.
pub const PROTECTED_ELEMENTS: &[&str] = &[
    "windows and window frames",
    "the exterior view through the windows",
    "the ceiling and ceiling fixtures",
    "walls, doors and the room's architectural structure",
];

/// Words that mean the user is asking about the floor itself.
pub const FLOORING_KEYWORDS: &[&str] = &[
    "floor", "carpet", "wood", "tile", "hardwood", "concrete", "rug",
];

const FLOORING_CLAUSE: &str = "Keep the original flooring material and color unchanged.";
const UNMENTIONED_FURNITURE_CLAUSE: &str =
    "Do NOT move, restyle, replace or remove any furniture or decor the request does not mention.";

/// Case-insensitive substring scan over [`FLOORING_KEYWORDS`].
pub fn mentions_flooring(text: &str) -> bool {
    let lowered = text.to_lowercase();
    FLOORING_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

fn protected_clause() -> String {
    format!(
        "Do NOT alter any of the following: {}.",
        PROTECTED_ELEMENTS.join("; ")
    )
}

fn clean_instruction(raw: &str) -> Option<&str> {
    let trimmed = raw.trim().trim_end_matches('.').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Whole-room redesign in `style_label`.
pub fn build_makeover_prompt(style_label: &str, instruction: &str) -> String {
    let mut prompt = format!(
        "Redesign this room to match the {style_label} style. Keep the original room layout but change the furniture and colors to match the {style_label} aesthetic. Photorealistic, 8k resolution, interior design photography."
    );
    prompt.push_str("\n\nSTRUCTURAL PRESERVATION: ");
    prompt.push_str(&protected_clause());
    if !mentions_flooring(instruction) {
        prompt.push(' ');
        prompt.push_str(FLOORING_CLAUSE);
    }
    if let Some(instruction) = clean_instruction(instruction) {
        prompt.push_str(&format!(
            "\n\nIMPORTANT SPECIFIC REQUIREMENT: {instruction}. Focus on this request."
        ));
    }
    prompt
}

/// Targeted insertion of `items_to_add` into an otherwise untouched photo.
pub fn build_partial_prompt(items_to_add: &str, style_label: &str, instruction: &str) -> String {
    let items = items_to_add.trim();
    let request = match clean_instruction(instruction) {
        Some(instruction) => format!("Add \"{items}\" and specifically \"{instruction}\""),
        None => format!("Add \"{items}\""),
    };
    format!(
        "Task: Precision In-Painting / Object Insertion.

The user wants to modify ONLY specific parts of the image.
USER REQUEST: {request}.
STYLE context for new items: {style_label}.

CRITICAL PRESERVATION RULES (STRICT ADHERENCE REQUIRED):
1. PRESERVE 99% OF THE ORIGINAL IMAGE PIXELS. This is NOT a redesign. This is a targeted edit.
2. {protected}
3. {furniture} Existing sofas, tables, rugs, art and screens stay exactly as they are unless the request names them.
4. IF adding an item, find an EMPTY spot and place it there. Do not replace existing furniture.
5. IF editing an item, change ONLY its color or texture. Keep the geometry and surrounding objects identical.

Output: A photorealistic image identical to the original except for the requested change.",
        protected = protected_clause(),
        furniture = UNMENTIONED_FURNITURE_CLAUSE,
    )
}

/// Targeted edit of the latest generated version.
pub fn build_refinement_prompt(instruction: &str) -> String {
    let request = clean_instruction(instruction).unwrap_or("Polish the design");
    let mut rules = vec![
        "Change ONLY the objects or surfaces named in the request.".to_string(),
        UNMENTIONED_FURNITURE_CLAUSE.to_string(),
        protected_clause(),
    ];
    if !mentions_flooring(instruction) {
        rules.push(FLOORING_CLAUSE.to_string());
    }
    let numbered = rules
        .iter()
        .enumerate()
        .map(|(idx, rule)| format!("{}. {rule}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Task: Targeted edit of an existing interior design image.

This image is the current design. Keep it as the starting point.
USER REQUEST: {request}.

RULES:
{numbered}

Output: A photorealistic image identical to the input except for the requested change."
    )
}

/// Shopping-list and palette extraction. A focus hint puts the items the
/// user asked for first.
pub fn build_extraction_prompt(focus_hint: Option<&str>) -> String {
    let focus = focus_hint.map(str::trim).filter(|value| !value.is_empty());
    let items = match focus {
        Some(focus) => format!(
            "Analyze this interior design image. The user specifically requested: \"{focus}\". Prioritize the items in the image that match this request, then add other defining pieces, returning between 5 and 8 items."
        ),
        None => "Analyze this interior design image. Identify 5 distinct, key furniture or decor items that define the style.".to_string(),
    };
    format!(
        "{items} For each item return its name, its specific color/material as seen in the image, and a google search query string to buy it (e.g., \"Modern blue velvet sofa buy online\"). Also return a palette of the 5 dominant colors in the image, each with a hex code and a descriptive name. Respond with JSON only: {{\"furniture\": [{{\"itemName\", \"color\", \"searchQuery\"}}], \"palette\": [{{\"hex\", \"name\"}}]}}."
    )
}

/// Instruction used when applying a palette as a refinement.
pub fn build_palette_instruction(palette: &Palette) -> String {
    let colors = palette
        .swatches
        .iter()
        .map(|swatch| format!("{} ({})", swatch.name, swatch.hex))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Recolor the soft furnishings using the \"{}\" palette: {colors}. Apply these colors to pillows, throws, curtains and upholstery accents. Keep every piece of furniture in place with its current shape",
        palette.name
    )
}
