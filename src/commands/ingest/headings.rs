use super::*;

const PSEUDO_HEADING_LEVEL: usize = 6;
const MIN_DESCRIPTION_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub line_index: usize,
    pub level: usize,
    pub text: String,
}

pub fn find_headings(patterns: &ExtractorPatterns, lines: &[&str]) -> Vec<Heading> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(line_index, line)| heading_at(patterns, line_index, line))
        .collect()
}

fn heading_at(patterns: &ExtractorPatterns, line_index: usize, line: &str) -> Option<Heading> {
    let trimmed = line.trim();
    if let Some(captures) = patterns.markdown_heading.captures(trimmed) {
        return Some(Heading {
            line_index,
            level: captures["hashes"].len(),
            text: clean_inline(patterns, &captures["text"]),
        });
    }

    let captures = patterns
        .bold_heading
        .captures(trimmed)
        .or_else(|| patterns.colon_heading.captures(trimmed))?;
    Some(Heading {
        line_index,
        level: PSEUDO_HEADING_LEVEL,
        text: captures["text"].trim().to_string(),
    })
}

fn is_section_heading(patterns: &ExtractorPatterns, text: &str) -> bool {
    patterns.ingredients_heading.is_match(text) || patterns.instructions_heading.is_match(text)
}

/// Line range owned by the heading: up to the next heading at the same or a higher level.
fn section_range(headings: &[Heading], start: &Heading, line_count: usize) -> (usize, usize) {
    let end = headings
        .iter()
        .filter(|heading| heading.line_index > start.line_index)
        .find(|heading| heading.level <= start.level || start.level == PSEUDO_HEADING_LEVEL)
        .map(|heading| heading.line_index)
        .unwrap_or(line_count);
    (start.line_index + 1, end)
}

fn section_lines<'a>(
    lines: &'a [&'a str],
    headings: &[Heading],
    start: &Heading,
) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    let (from, to) = section_range(headings, start, lines.len());
    let heading_lines = headings
        .iter()
        .map(|heading| heading.line_index)
        .collect::<Vec<usize>>();
    (from..to)
        .filter(move |index| !heading_lines.contains(index))
        .map(move |index| (index, lines[index]))
}

pub fn collect_ingredients(
    patterns: &ExtractorPatterns,
    lines: &[&str],
    headings: &[Heading],
) -> Vec<String> {
    let Some(start) = headings
        .iter()
        .find(|heading| patterns.ingredients_heading.is_match(&heading.text))
    else {
        return Vec::new();
    };

    section_lines(lines, headings, start)
        .filter_map(|(_, line)| patterns.list_item.captures(line).map(|c| c["body"].to_string()))
        .map(|body| clean_inline(patterns, &body))
        .filter(|body| !body.is_empty())
        .collect()
}

pub fn collect_instructions(
    patterns: &ExtractorPatterns,
    config: &ExtractionConfig,
    lines: &[&str],
    headings: &[Heading],
) -> Vec<String> {
    let Some(start) = headings
        .iter()
        .find(|heading| patterns.instructions_heading.is_match(&heading.text))
    else {
        return Vec::new();
    };

    let mut steps = Vec::new();
    for (_, line) in section_lines(lines, headings, start) {
        let trimmed = line.trim();
        if trimmed.is_empty() || patterns.markdown_image.is_match(trimmed) {
            continue;
        }

        if let Some(captures) = patterns.list_item.captures(trimmed) {
            let body = clean_inline(patterns, strip_step_prefix(patterns, &captures["body"]));
            if !body.is_empty() {
                steps.push(body);
            }
            continue;
        }

        let paragraph = clean_inline(patterns, strip_step_prefix(patterns, trimmed));
        if paragraph.chars().count() >= config.min_instruction_chars {
            steps.push(paragraph);
        }
    }

    steps
}

fn find_title(
    patterns: &ExtractorPatterns,
    document: &SourceDocument,
    headings: &[Heading],
) -> Option<String> {
    if let Some(title) = non_empty(document.metadata.title.as_deref()) {
        return Some(clean_title(&title));
    }

    headings
        .iter()
        .filter(|heading| heading.level < PSEUDO_HEADING_LEVEL)
        .filter(|heading| !is_section_heading(patterns, &heading.text))
        .min_by_key(|heading| (heading.level, heading.line_index))
        .map(|heading| clean_title(&heading.text))
        .filter(|title| !title.is_empty())
}

fn find_description(
    patterns: &ExtractorPatterns,
    document: &SourceDocument,
    lines: &[&str],
    headings: &[Heading],
) -> Option<String> {
    if let Some(description) = non_empty(document.metadata.description.as_deref()) {
        return Some(description);
    }

    let first_section = headings
        .iter()
        .find(|heading| is_section_heading(patterns, &heading.text))
        .map(|heading| heading.line_index)
        .unwrap_or(lines.len());

    lines[..first_section]
        .iter()
        .enumerate()
        .filter(|(index, _)| !headings.iter().any(|heading| heading.line_index == *index))
        .map(|(_, line)| line.trim())
        .filter(|line| !patterns.list_item.is_match(line) && !patterns.markdown_image.is_match(line))
        .map(|line| clean_inline(patterns, line))
        .find(|line| line.chars().count() >= MIN_DESCRIPTION_CHARS)
}

fn labelled_value(pattern: &regex::Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .map(|c| c["v"].trim().trim_end_matches("**").trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn recipe_from_headings(
    patterns: &ExtractorPatterns,
    durations: &DurationPatterns,
    config: &ExtractionConfig,
    document: &SourceDocument,
) -> Option<ExtractedRecipe> {
    let lines = document.raw_text.lines().collect::<Vec<&str>>();
    let headings = find_headings(patterns, &lines);
    let title = find_title(patterns, document, &headings)?;

    let times = durations.find_times(&document.raw_text);
    let tags = labelled_value(&patterns.tags_line, &document.raw_text)
        .map(|value| {
            value
                .split(',')
                .filter_map(|part| non_empty(Some(part)))
                .collect::<Vec<String>>()
        })
        .unwrap_or_default();

    Some(ExtractedRecipe {
        url: document.url.clone(),
        title,
        description: find_description(patterns, document, &lines, &headings),
        ingredients: collect_ingredients(patterns, &lines, &headings),
        instructions: collect_instructions(patterns, config, &lines, &headings),
        prep_minutes: times.prep_minutes,
        cook_minutes: times.cook_minutes,
        total_minutes: times.total_minutes,
        servings: durations.find_servings(&document.raw_text),
        difficulty: labelled_value(&patterns.difficulty_line, &document.raw_text),
        cuisine: labelled_value(&patterns.cuisine_line, &document.raw_text),
        tags,
        image_url: first_image(patterns, &document.raw_text)
            .or_else(|| non_empty(document.metadata.image.as_deref())),
    })
}
