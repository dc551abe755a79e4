use shared_types::FactCategory;

const PERSONA: &str = "You are an award-winning smart TV comedy writer. Write for the character Ms. Casey from the TV show Severance. Generate a wellness fact about someone's \"Outie\" (outside work self) that contrasts with their \"innie\" (work self).";

const GUIDELINES: &str = "The wellness fact should:
1. Create an interesting contrast with their work traits
2. Be oddly specific
3. Sound slightly absurd yet plausible
4. Have the same clinical, corporate tone used in Severance
5. Be a single sentence starting with \"Your Outie\"
6. Keep it to about 15 words or less";

const TONE_NOTE: &str = "Note on tone: The wellness facts should have a clinical, corporate delivery but describe something oddly specific or slightly absurd about the Outie's life outside work. The contrast between the formal delivery and the quirky content creates the distinctive Severance humor.";

const EXAMPLE_FACTS: &[&str] = &[
    "Your Outie can parallel park in less than 20 seconds.",
    "Your Outie knows a beautiful rock from a plain one.",
    "Your Outie is splendid and can swim gracefully and well.",
    "Your Outie has both zaz and pep.",
    "Your Outie makes pleasing noises.",
    "Your Outie can leap admirably but does not do so to show off.",
    "Your Outie is the second tallest of their friend group.",
    "Your Outie listens to music while shaving, but not while showering.",
    "Your Outie prefers two scoops of ice cream in a serving, but they must be the same flavor.",
    "Your Outie has been mistaken for a celebrity who is widely considered handsome.",
    "Your Outie understands the difference between an insect and an arachnid.",
    "Your Outie is familiar with the myth of Hercules and derives great meaning from it.",
    "Your Outie has survived multiple earthquakes and will survive more.",
    "Your Outie does not make adults with visible orthodontia feel unwelcome or judged.",
    "Your Outie likes the sound of radar.",
];

const EXAMPLE_CONTRASTS: &[(&str, &str)] = &[
    (
        "Detail-oriented",
        "Your Outie alphabetizes their spice rack but never cooks.",
    ),
    (
        "Reserved in meetings",
        "Your Outie performs amateur stand-up comedy every third Thursday.",
    ),
    (
        "Rule-follower",
        "Your Outie has a collection of parking tickets they're oddly proud of.",
    ),
];

/// Render the single-fact generation prompt.
pub fn build_fact_prompt(traits: &str, category: FactCategory, prior_facts: &[String]) -> String {
    let examples = EXAMPLE_FACTS
        .iter()
        .map(|fact| format!("- \"{fact}\""))
        .collect::<Vec<_>>()
        .join("\n");
    let contrasts = EXAMPLE_CONTRASTS
        .iter()
        .map(|(innie, outie)| format!("- Innie: \"{innie}\" -> \"{outie}\""))
        .collect::<Vec<_>>()
        .join("\n");
    let previous = if prior_facts.is_empty() {
        "None yet".to_string()
    } else {
        prior_facts.join("\n")
    };
    let category_tags = FactCategory::ALL
        .iter()
        .map(FactCategory::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{PERSONA}

The fact should follow this format: \"Your Outie [fact about outside life].\"

The innie (work self) is described as, or has these traits:
{traits}

{GUIDELINES}
7. Focus on the category: {category}

{TONE_NOTE}

Example wellness facts from the show:
{examples}

Example contrasts between innie traits and Outie facts:
{contrasts}

Previously generated facts for this person:
{previous}

IMPORTANT: Your fact MUST be completely different from any previously generated facts. Do not repeat themes, activities, or concepts.

Return only the wellness fact as a JSON object with keys \"fact\" and \"category\", like this:
{{\"fact\": \"Your Outie [fact about outside life].\", \"category\": \"[one of: {category_tags}]\"}}",
        traits = traits.trim(),
    )
}
