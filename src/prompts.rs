use crate::core::bookmarks::{BookmarkMap, BRD_OUTLINE};
use crate::core::segmenter::parse_heading;

/// Heading text the test-scenario output is spliced under.
pub const TEST_SCENARIOS_HEADING: &str = "7.0 Test Scenarios";
const TEST_SCENARIOS_BOOKMARK: &str = "test_scenarios";

/// The BRD outline as markdown headings, sub-items indented.
pub fn brd_format() -> String {
    BRD_OUTLINE
        .iter()
        .map(|e| format!("{}## {}\n", "    ".repeat(e.indent as usize), e.label()))
        .collect()
}

/// First chain: synthesize the BRD from extracted requirement text.
pub fn brd_prompt(requirements: &str, tables: &str) -> String {
    let format = brd_format();
    format!(
        r#"Create a Business Requirements Document (BRD) from the material below.

Document structure (use these headings, in this order, as markdown `##` headings):
{format}
Requirements:
Map the relevant information from the requirement documents to each section of the structure. Be concise and specific; leave out speculation.

{requirements}

Tables:
Where relevant, reproduce these tables as markdown pipe tables. A line of the form [[TABLE_ID:token]] may be written on its own line instead to insert the original table unchanged.
{tables}

Formatting:
1. Use the headings above exactly; use `###` for anything below them.
2. Use "- " bullets or "1. " numbered lists where they help readability.
3. Separate functional from non-functional requirements.
4. Tables must have a header row and a `---` separator row.
"#
    )
}

/// Second chain: test scenarios for section 7.0, given the whole BRD.
pub fn test_scenarios_prompt(brd: &str) -> String {
    format!(
        r#"Based on the Business Requirements Document below, write the body of section {TEST_SCENARIOS_HEADING}.

BRD:
{brd}

Write at least 5 test scenarios that together validate the requirements. For each scenario give:
- a test ID and descriptive name
- the objective
- numbered test steps
- expected results / acceptance criteria
- test data, if any
- whether it is a positive or negative case
- dependencies or prerequisites

Do not repeat the section heading. Use `###` for each scenario title.
"#
    )
}

/// Insert `scenarios` after the first heading that resolves to the test
/// scenarios outline entry (by number or, ignoring case, by title); append a
/// new [`TEST_SCENARIOS_HEADING`] section if there is none.
pub fn splice_test_scenarios(brd: &str, scenarios: &str) -> String {
    let scenarios = scenarios.trim();
    let map = BookmarkMap::default();
    let is_target = |line: &str| {
        line.starts_with('#')
            && map
                .lookup(&parse_heading(line).1)
                .is_some_and(|e| e.bookmark == TEST_SCENARIOS_BOOKMARK)
    };
    let mut out = String::with_capacity(brd.len() + scenarios.len() + 32);
    let mut spliced = false;

    for line in brd.lines() {
        out.push_str(line);
        out.push('\n');
        if !spliced && is_target(line) {
            out.push_str(scenarios);
            out.push('\n');
            spliced = true;
        }
    }

    if !spliced {
        if !out.is_empty() && !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(&format!("## {TEST_SCENARIOS_HEADING}\n{scenarios}\n"));
    }
    out
}
