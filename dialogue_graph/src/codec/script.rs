//! Line-oriented dialogue script.
//!
//! ```text
//! title: GATE_GUARD
//! ---
//! display: Gate Guard
//! tags: act1, guard
//! <<music tense>>
//! ===
//! <<before: camera guard>>
//! Guard: Halt! #angry
//! <<after: shake>>
//! -> I'm a friend. <<if has_pass>> #polite
//!     <<jump FRIEND>>
//!     <<set trust 1>>
//! -> Leave.
//! <<jump LEFT_GATE>>
//! ===
//! ```
//!
//! Indented directives under a `->` line belong to that choice; the first one
//! may be its `<<jump>>`. An unindented `<<jump>>` is the fallthrough. A line
//! starting with `:` has no speaker. Blank lines and `//` comments are ignored.
//!
//! A backslash escapes the next character, and `\n` / `\r` stand for line
//! breaks. [`render`] escapes `#`, `<`, `>` in text, `:` in speakers, and a
//! leading `\` marks a command that would otherwise read as `jump`, `before:`
//! or `after:`.
//!
//! Parsing never fails loudly: malformed input yields `None` and a warning.

use dialogue_model::{ChoiceOption, DialogueElement, DialogueLine, Interaction};
use std::iter::Peekable;
use std::str::Lines;

const TITLE: &str = "title:";
const HEADER_END: &str = "---";
const SECTION_END: &str = "===";
const DISPLAY: &str = "display:";
const TAGS: &str = "tags:";
const JUMP: &str = "jump ";
const CONDITION: &str = "<<if ";
const BEFORE: &str = "before:";
const AFTER: &str = "after:";
const INDENT: &str = "    ";

/// Directive keywords; a plain command starting with one is escaped.
const KEYWORDS: [&str; 3] = [JUMP, BEFORE, AFTER];

/// Line starts that the parser treats as structure.
const LEADING_MARKERS: [&str; 5] = ["->", "//", SECTION_END, HEADER_END, TITLE];

const TEXT_ESCAPES: &[char] = &['#', '<', '>'];
const SPEAKER_ESCAPES: &[char] = &['#', '<', '>', ':'];
const DIRECTIVE_ESCAPES: &[char] = &['<', '>'];

/// Parse one interaction.
pub fn parse(text: &str) -> Option<Interaction> {
    let mut lines = text.lines().peekable();

    let id = match next_significant(&mut lines).and_then(|line| line.strip_prefix(TITLE)) {
        Some(id) if !id.trim().is_empty() => id.trim(),
        _ => {
            log::warn!("script: expected 'title: <id>' as the first line");
            return None;
        }
    };
    if next_significant(&mut lines) != Some(HEADER_END) {
        log::warn!("script {}: missing '{}' after the title", id, HEADER_END);
        return None;
    }

    let mut interaction = Interaction::new(id);
    parse_header(&mut lines, &mut interaction)?;

    let mut body = BodyParser::default();
    loop {
        let Some(raw) = lines.next() else {
            log::warn!("script {}: missing closing '{}'", interaction.id, SECTION_END);
            return None;
        };
        let line = raw.trim();
        if line == SECTION_END {
            break;
        }
        if is_skippable(line) {
            continue;
        }
        body.line(raw, line, &mut lines);
    }

    let (elements, fallthrough) = body.finish(&interaction.id);
    interaction.set_elements(elements);
    interaction.next_interaction_id_if_no_choices = fallthrough;
    Some(interaction)
}

/// Parse every interaction in a multi-interaction script.
///
/// Each unindented `title:` line starts a new interaction. Interactions that
/// fail to parse are skipped.
pub fn parse_all(text: &str) -> Vec<Interaction> {
    let mut chunks: Vec<Vec<&str>> = Vec::new();
    for line in text.lines() {
        if line.starts_with(TITLE) || chunks.is_empty() {
            chunks.push(Vec::new());
        }
        if let Some(chunk) = chunks.last_mut() {
            chunk.push(line);
        }
    }

    chunks
        .iter()
        .filter(|chunk| chunk.iter().any(|line| !is_skippable(line.trim())))
        .filter_map(|chunk| parse(&chunk.join("\n")))
        .collect()
}

/// Render an interaction as script text.
pub fn render(interaction: &Interaction) -> String {
    let mut out = vec![format!("{} {}", TITLE, interaction.id), HEADER_END.to_string()];

    if !interaction.title.is_empty() {
        out.push(format!("{} {}", DISPLAY, escape(&interaction.title, &[])));
    }
    if !interaction.header_tags.is_empty() {
        let tags: Vec<&str> = interaction.header_tags.iter().map(String::as_str).collect();
        out.push(format!("{} {}", TAGS, tags.join(", ")));
    }
    out.extend(interaction.header_commands.iter().map(|command| command_directive(command)));
    out.push(SECTION_END.to_string());

    for element in &interaction.elements {
        match element {
            DialogueElement::DialogueLine(line) => render_line(line, &mut out),
            DialogueElement::PlayerChoice { options } => {
                for option in options {
                    render_option(option, &mut out);
                }
            }
            DialogueElement::Command { command } => out.push(command_directive(command)),
        }
    }

    if let Some(next) = interaction.fallthrough() {
        out.push(keyword_directive(JUMP, next));
    }
    out.push(SECTION_END.to_string());

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// Render several interactions separated by blank lines.
pub fn render_all(interactions: &[Interaction]) -> String {
    interactions.iter().map(render).collect::<Vec<_>>().join("\n")
}

fn render_line(line: &DialogueLine, out: &mut Vec<String>) {
    for command in &line.pre_line_commands {
        out.push(keyword_directive(BEFORE, &format!(" {}", command)));
    }

    let text = escape(&line.text, TEXT_ESCAPES);
    let mut rendered = match line.speaker.as_deref().filter(|speaker| !speaker.is_empty()) {
        Some(speaker) => format!("{}: {}", escape(speaker, SPEAKER_ESCAPES), text),
        None if text.is_empty() || text.contains(':') => format!(": {}", text),
        None => text,
    };
    if LEADING_MARKERS.iter().any(|marker| rendered.starts_with(marker)) {
        rendered.insert(0, '\\');
    }
    push_tags(&mut rendered, &line.tags);
    out.push(rendered);

    for command in &line.post_line_commands {
        out.push(keyword_directive(AFTER, &format!(" {}", command)));
    }
}

fn render_option(option: &ChoiceOption, out: &mut Vec<String>) {
    let mut text = format!("-> {}", escape(&option.text, TEXT_ESCAPES));
    if let Some(condition) = &option.condition {
        text.push_str(&format!(" {}{}>>", CONDITION, escape(condition, TEXT_ESCAPES)));
    }
    push_tags(&mut text, &option.tags);
    out.push(text);

    if let Some(target) = option.target() {
        out.push(format!("{}{}", INDENT, keyword_directive(JUMP, target)));
    }
    for action in &option.actions {
        out.push(format!("{}{}", INDENT, command_directive(action)));
    }
}

fn push_tags(text: &mut String, tags: &[String]) {
    for tag in tags {
        text.push_str(" #");
        text.push_str(&escape(tag, TEXT_ESCAPES));
    }
}

/// `<<keyword argument>>` with the argument escaped.
fn keyword_directive(keyword: &str, argument: &str) -> String {
    format!("<<{}{}>>", keyword, escape(argument, DIRECTIVE_ESCAPES))
}

/// A free-form command, marked with `\` when it starts like a keyword.
fn command_directive(command: &str) -> String {
    let body = escape(command, DIRECTIVE_ESCAPES);
    if KEYWORDS.iter().any(|keyword| body.starts_with(keyword)) {
        format!("<<\\{}>>", body)
    } else {
        format!("<<{}>>", body)
    }
}

/// Backslash-escape `\`, line breaks and `extra`.
fn escape(text: &str, extra: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ch if extra.contains(&ch) => {
                out.push('\\');
                out.push(ch);
            }
            ch => out.push(ch),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(next) => out.push(next),
            None => out.push('\\'),
        }
    }
    out
}

/// Byte offset of the first `target` not preceded by an escaping `\`.
fn find_unescaped(text: &str, target: char) -> Option<usize> {
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == target {
            return Some(index);
        }
    }
    None
}

fn is_skippable(line: &str) -> bool {
    line.is_empty() || line.starts_with("//")
}

fn is_indented(raw: &str) -> bool {
    raw.starts_with(char::is_whitespace)
}

fn next_significant<'a>(lines: &mut Peekable<Lines<'a>>) -> Option<&'a str> {
    lines.map(str::trim).find(|line| !is_skippable(line))
}

/// Inner text of a `<<...>>` directive, still escaped.
fn directive_body(line: &str) -> Option<&str> {
    line.strip_prefix("<<")?.strip_suffix(">>").map(str::trim)
}

fn jump_target(line: &str) -> Option<String> {
    directive_body(line.trim())?
        .strip_prefix(JUMP)
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(unescape)
}

/// Strip trailing `#tag` tokens. Escaped `\#` never starts a tag.
fn split_tags(content: &str) -> (&str, Vec<String>) {
    let mut rest = content.trim_end();
    let mut tags = Vec::new();

    while let Some((head, last)) = rest.rsplit_once(char::is_whitespace) {
        match last.strip_prefix('#') {
            Some(tag) if !tag.is_empty() => {
                tags.push(unescape(tag));
                rest = head.trim_end();
            }
            _ => break,
        }
    }

    tags.reverse();
    (rest, tags)
}

fn parse_header(lines: &mut Peekable<Lines<'_>>, interaction: &mut Interaction) -> Option<()> {
    loop {
        let Some(line) = lines.next().map(str::trim) else {
            log::warn!("script {}: header is not closed by '{}'", interaction.id, SECTION_END);
            return None;
        };
        if line == SECTION_END {
            return Some(());
        }
        if is_skippable(line) {
            continue;
        }

        if let Some(title) = line.strip_prefix(DISPLAY) {
            interaction.title = unescape(title.trim());
        } else if let Some(tags) = line.strip_prefix(TAGS) {
            interaction.header_tags.extend(
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string),
            );
        } else if let Some(command) = directive_body(line) {
            interaction.header_commands.push(unescape(command));
        } else {
            log::warn!("script {}: unexpected header line '{}'", interaction.id, line);
            return None;
        }
    }
}

fn parse_choice(content: &str) -> ChoiceOption {
    let (rest, tags) = split_tags(content.trim());

    let mut option = match rest.rfind(CONDITION).filter(|_| rest.ends_with(">>")) {
        Some(start) => ChoiceOption::dead_end(unescape(rest[..start].trim()))
            .with_condition(unescape(rest[start + CONDITION.len()..rest.len() - 2].trim())),
        None => ChoiceOption::dead_end(unescape(rest)),
    };
    option.tags = tags;
    option
}

fn parse_line(content: &str) -> DialogueLine {
    let (rest, tags) = split_tags(content);

    let mut line = match find_unescaped(rest, ':') {
        Some(colon) => {
            let speaker = unescape(rest[..colon].trim());
            let text = unescape(rest[colon + 1..].trim());
            DialogueLine::new((!speaker.is_empty()).then_some(speaker.as_str()), text)
        }
        None => DialogueLine::new(None, unescape(rest)),
    };
    line.tags = tags;
    line
}

/// Body state between the header and the closing `===`.
#[derive(Default)]
struct BodyParser {
    elements: Vec<DialogueElement>,
    options: Vec<ChoiceOption>,
    pending_pre: Vec<String>,
    fallthrough: Option<String>,
}

impl BodyParser {
    fn line(&mut self, raw: &str, line: &str, lines: &mut Peekable<Lines<'_>>) {
        if let Some(content) = line.strip_prefix("->") {
            let mut option = parse_choice(content);
            let next = lines.peek().copied();
            if let Some(target) = next.filter(|next| is_indented(next)).and_then(jump_target) {
                option.next_interaction_id = Some(target);
                lines.next();
            }
            self.options.push(option);
            return;
        }

        if line.starts_with("<<") {
            let Some(body) = directive_body(line) else {
                log::debug!("script: skipping unterminated directive '{}'", line);
                return;
            };
            self.directive(raw, line, body);
            return;
        }

        self.close_choices();
        let mut dialogue = parse_line(line);
        dialogue.pre_line_commands = std::mem::take(&mut self.pending_pre);
        self.elements.push(dialogue.into());
    }

    fn directive(&mut self, raw: &str, line: &str, body: &str) {
        if is_indented(raw) {
            if let Some(option) = self.options.last_mut() {
                option.actions.push(unescape(body));
                return;
            }
        }

        if let Some(target) = jump_target(line) {
            self.close_choices();
            self.fallthrough = Some(target);
        } else if let Some(command) = body.strip_prefix(BEFORE) {
            self.close_choices();
            self.pending_pre.push(unescape(command.trim()));
        } else if let Some(command) = body.strip_prefix(AFTER) {
            match self.last_line_mut() {
                Some(dialogue) => dialogue.post_line_commands.push(unescape(command.trim())),
                None => log::debug!("script: '{}' does not follow a dialogue line", line),
            }
        } else {
            self.close_choices();
            self.elements.push(DialogueElement::command(unescape(body)));
        }
    }

    fn last_line_mut(&mut self) -> Option<&mut DialogueLine> {
        if !self.options.is_empty() {
            return None;
        }
        match self.elements.last_mut() {
            Some(DialogueElement::DialogueLine(line)) => Some(line),
            _ => None,
        }
    }

    fn close_choices(&mut self) {
        if !self.options.is_empty() {
            let options = std::mem::take(&mut self.options);
            self.elements.push(DialogueElement::choices(options));
        }
    }

    fn finish(mut self, id: &str) -> (Vec<DialogueElement>, Option<String>) {
        self.close_choices();
        if !self.pending_pre.is_empty() {
            log::debug!(
                "script {}: dropping {} 'before' commands with no following line",
                id,
                self.pending_pre.len()
            );
        }
        (self.elements, self.fallthrough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> Interaction {
        let greeting = DialogueLine::new(Some("Guard"), "Halt! Who goes there?")
            .with_tag("angry")
            .with_pre_command("camera guard")
            .with_post_command("shake");

        Interaction::new("GATE_GUARD")
            .with_title("Gate Guard")
            .with_tag("act1")
            .with_tag("guard")
            .with_header_command("music tense")
            .with_element(greeting)
            .with_line(None, "The torch flickers: wind.")
            .with_command("play_sfx gate")
            .with_choices(vec![
                ChoiceOption::new("I'm a friend.", "FRIEND")
                    .with_condition("has_pass")
                    .with_tag("polite")
                    .with_action("set trust 1"),
                ChoiceOption::dead_end("Leave."),
            ])
            .with_next("LEFT_GATE")
    }

    #[test]
    fn test_render_layout() {
        let text = render(&guard());
        let expected = "\
title: GATE_GUARD
---
display: Gate Guard
tags: act1, guard
<<music tense>>
===
<<before: camera guard>>
Guard: Halt! Who goes there? #angry
<<after: shake>>
: The torch flickers: wind.
<<play_sfx gate>>
-> I'm a friend. <<if has_pass>> #polite
    <<jump FRIEND>>
    <<set trust 1>>
-> Leave.
<<jump LEFT_GATE>>
===
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_roundtrip_preserves_interaction() {
        let interaction = guard();
        assert_eq!(parse(&render(&interaction)), Some(interaction));
    }

    #[test]
    fn test_roundtrip_of_empty_interaction() {
        let interaction = Interaction::new("EMPTY");
        assert_eq!(parse(&render(&interaction)), Some(interaction));
    }

    #[test]
    fn test_choice_jump_lookahead_is_one_line() {
        let text = "\
title: A
---
===
-> Wait
    <<set waited>>
    <<jump B>>
===";
        let interaction = parse(text).unwrap();
        let option = interaction.choice_options().next().unwrap();

        assert!(option.is_dead_end());
        assert_eq!(option.actions, vec!["set waited", "jump B"]);
    }

    #[test]
    fn test_comments_blank_lines_and_unterminated_directives_are_skipped() {
        let text = "\
// leading comment
title: A

---
===

// body comment
Mira: Hello.
<<broken
-> Bye
    <<jump B>>
===";
        let interaction = parse(text).unwrap();

        assert_eq!(interaction.elements.len(), 2);
        assert_eq!(interaction.dialogue_lines().next().unwrap().speaker.as_deref(), Some("Mira"));
        assert_eq!(interaction.choice_options().next().unwrap().target(), Some("B"));
    }

    #[test]
    fn test_malformed_scripts_yield_none() {
        assert!(parse("").is_none());
        assert!(parse("name: A\n---\n===\n===").is_none());
        assert!(parse("title:\n---\n===\n===").is_none());
        assert!(parse("title: A\n===\n===").is_none());
        assert!(parse("title: A\n---\nbogus\n===\n===").is_none());
        assert!(parse("title: A\n---\n===\nMira: Hi").is_none());
        assert!(parse("title: A\n---\ntags: x").is_none());
    }

    #[test]
    fn test_consecutive_choices_form_one_block() {
        let text = "title: A\n---\n===\n-> One\n    <<jump B>>\n-> Two\n    <<jump C>>\n===";
        let interaction = parse(text).unwrap();

        assert_eq!(interaction.elements.len(), 1);
        let targets: Vec<_> = interaction.choice_options().filter_map(|o| o.target()).collect();
        assert_eq!(targets, vec!["B", "C"]);
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("Hello #a #b"), ("Hello", vec!["a".to_string(), "b".to_string()]));
        assert_eq!(split_tags("Issue #5 is open"), ("Issue #5 is open", Vec::<String>::new()));
        assert_eq!(split_tags("Lonely # "), ("Lonely #", Vec::<String>::new()));
    }

    #[test]
    fn test_parse_all_skips_broken_interactions() {
        let good = render(&guard());
        let text = format!(
            "// act one\n{}\ntitle: BROKEN\n---\n===\nno end\n{}",
            good,
            render(&Interaction::new("FRIEND").with_line(Some("Guard"), "Pass."))
        );

        let ids: Vec<_> = parse_all(&text).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["GATE_GUARD", "FRIEND"]);
    }

    #[test]
    fn test_render_all_roundtrip() {
        let interactions = vec![guard(), Interaction::new("FRIEND").with_line(Some("Guard"), "Pass.")];
        assert_eq!(parse_all(&render_all(&interactions)), interactions);
    }

    #[test]
    fn test_hash_in_text_and_speaker_is_not_a_tag() {
        let interaction = Interaction::new("HASHES")
            .with_line(Some("Guard"), "Go to room #4")
            .with_line(Some("Agent #7"), "Report.")
            .with_choices(vec![ChoiceOption::new("Take exit #north", "B").with_tag("exit#1")]);

        let text = render(&interaction);
        assert!(text.contains("Guard: Go to room \\#4\n"));
        assert!(text.contains("-> Take exit \\#north #exit\\#1\n"));

        let parsed = parse(&text).unwrap();
        let lines: Vec<_> = parsed.dialogue_lines().collect();
        assert_eq!(lines[0].text, "Go to room #4");
        assert!(lines[0].tags.is_empty());
        assert_eq!(lines[1].speaker.as_deref(), Some("Agent #7"));
        let option = parsed.choice_options().next().unwrap();
        assert_eq!(option.tags, vec!["exit#1"]);
        assert_eq!(option.text, "Take exit #north");
        assert_eq!(parsed, interaction);
    }

    #[test]
    fn test_embedded_newline_stays_on_one_line() {
        let interaction = Interaction::new("HALT")
            .with_title("Night\nWatch")
            .with_line(Some("Guard"), "Halt.\nWho: goes there?")
            .with_line(Some("Guard"), "C:\\gate\\log");

        let text = render(&interaction);
        assert!(text.contains("Guard: Halt.\\nWho: goes there?\n"));
        assert_eq!(parse(&text), Some(interaction));
    }

    #[test]
    fn test_keyword_like_commands_roundtrip() {
        let interaction = Interaction::new("KEYWORDS")
            .with_line(None, "Look around.")
            .with_command("jump X")
            .with_command("before: x")
            .with_command("after:y")
            .with_choices(vec![
                ChoiceOption::dead_end("Wait").with_action("jump X"),
                ChoiceOption::new("Go", "B").with_action("jump C"),
            ]);

        let text = render(&interaction);
        assert!(text.contains("<<\\jump X>>"));
        assert!(text.contains("-> Wait\n    <<\\jump X>>\n"));

        let parsed = parse(&text).unwrap();
        assert!(parsed.fallthrough().is_none());
        assert!(parsed.choice_options().next().unwrap().is_dead_end());
        assert_eq!(parsed, interaction);
    }

    #[test]
    fn test_structural_markers_in_text_roundtrip() {
        let interaction = Interaction::new("MARKERS")
            .with_line(Some("title"), "Mr.")
            .with_line(None, "-> not a choice")
            .with_line(None, "// not a comment")
            .with_line(None, "=== not the end")
            .with_line(None, "<<not a directive>>")
            .with_line(Some("Sage"), "a < b >> c")
            .with_choices(vec![ChoiceOption::new("Pay", "SHOP").with_condition("gold > 3 #rich")]);

        let text = render(&interaction);
        assert!(text.contains("\n\\title: Mr.\n"));
        assert!(text.contains("\n-\\> not a choice\n"));
        assert_eq!(parse(&text), Some(interaction.clone()));
        assert_eq!(parse_all(&text), vec![interaction]);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a\\#b\\nc\\\\"), "a#b\nc\\");
        assert_eq!(unescape("trailing\\"), "trailing\\");
        assert_eq!(find_unescaped("a\\:b:c", ':'), Some(4));
        assert_eq!(find_unescaped("a\\:b", ':'), None);
    }
}
