use mdcmd::block::replacement_lines;
use mdcmd::{Block, BlockKind, Document, Filter, ParseError, Scan, ScanOptions, Segment, scan};

fn scan_with(source: &str, options: &ScanOptions) -> Result<Scan, ParseError> {
    let doc = Document::parse(source, 0);
    scan(&doc, options)
}

fn scan_ok(source: &str) -> Scan {
    scan_with(source, &ScanOptions::default()).expect("scan failed")
}

fn literals(scan: &Scan) -> Vec<&str> {
    scan.segments
        .iter()
        .filter_map(|s| match s {
            Segment::Literal(text) => Some(text.as_str()),
            Segment::Command(_) => None,
        })
        .collect()
}

fn only_block(scan: &Scan) -> &Block {
    let commands: Vec<_> = scan.commands().collect();
    assert_eq!(commands.len(), 1, "expected exactly one command");
    &commands[0].block
}

#[test]
fn plain_document_passes_through() {
    let scan = scan_ok("# Title\n\nSome text.\n");
    assert_eq!(literals(&scan), vec!["# Title", "", "Some text."]);
    assert_eq!(scan.commands().count(), 0);
}

#[test]
fn directive_line_is_kept_and_fence_consumed() {
    let scan = scan_ok("# T\n\n<!-- `echo hi` -->\n```\nold\n```\nafter\n");
    assert_eq!(literals(&scan), vec!["# T", "", "<!-- `echo hi` -->", "after"]);

    let command = scan.commands().next().unwrap();
    assert_eq!(command.directive.command, "echo hi");
    assert_eq!(command.directive.argv, vec!["echo", "hi"]);
    assert_eq!(command.directive.line, 3);
    assert_eq!(command.block.kind, BlockKind::Fenced { double: false });
    assert_eq!(command.block.lines, vec!["```", "old", "```"]);
}

#[test]
fn fence_with_language_tag() {
    let scan = scan_ok("<!-- `cat x.json` -->\n```json\n{}\n```\n");
    assert_eq!(only_block(&scan).lines, vec!["```json", "{}", "```"]);
}

#[test]
fn double_fence_for_bmdff() {
    let src = "<!-- `bmdff seq 2` -->\n```bash\nseq 2\n```\n```\n1\n2\n```\ntail\n";
    let scan = scan_ok(src);
    let block = only_block(&scan);
    assert_eq!(block.kind, BlockKind::Fenced { double: true });
    assert_eq!(block.lines.len(), 7);
    assert_eq!(literals(&scan).last(), Some(&"tail"));
}

#[test]
fn html_block_closes_at_matching_tag() {
    let src = "<!-- `bmdfff ls` -->\n<details><summary>ls</summary>\n\n```\na\n```\n</details>\nend\n";
    let scan = scan_ok(src);
    let block = only_block(&scan);
    assert_eq!(
        block.kind,
        BlockKind::Html {
            tag: "details".to_string()
        }
    );
    assert_eq!(block.lines.first().map(String::as_str), Some("<details><summary>ls</summary>"));
    assert_eq!(block.lines.last().map(String::as_str), Some("</details>"));
    assert_eq!(literals(&scan).last(), Some(&"end"));
}

#[test]
fn html_open_tag_with_attributes() {
    let scan = scan_ok("<!-- `date` -->\n<div class=\"x\" hidden>\nold\n</div>\n");
    assert_eq!(only_block(&scan).lines.len(), 3);
}

#[test]
fn list_block_stops_before_terminator() {
    let src = "<!-- `ls` -->\n- a\n- b\n  continued\nNext paragraph\n";
    let scan = scan_ok(src);
    let block = only_block(&scan);
    assert_eq!(block.kind, BlockKind::List);
    assert_eq!(block.lines, vec!["- a", "- b", "  continued"]);
    assert_eq!(literals(&scan), vec!["<!-- `ls` -->", "Next paragraph"]);
}

#[test]
fn list_block_takes_its_blank_separator() {
    let src = "<!-- `ls` -->\n- a\n\n- not part of it\n";
    let scan = scan_ok(src);
    let block = only_block(&scan);
    assert_eq!(block.lines, vec!["- a", ""]);
    assert_eq!(literals(&scan), vec!["<!-- `ls` -->", "- not part of it"]);
}

#[test]
fn link_definitions_are_consumed_contiguously() {
    let src = "<!-- `links` -->\n[a]: https://a\n[b]: https://b\n\ntext\n";
    let scan = scan_ok(src);
    let block = only_block(&scan);
    assert_eq!(block.kind, BlockKind::LinkDefs);
    assert_eq!(block.lines, vec!["[a]: https://a", "[b]: https://b"]);
    assert_eq!(literals(&scan), vec!["<!-- `links` -->", "", "text"]);
}

#[test]
fn blank_line_and_end_of_input() {
    let scan = scan_ok("<!-- `a` -->\n\ntext\n<!-- `b` -->\n");
    let kinds: Vec<_> = scan.commands().map(|c| c.block.kind.clone()).collect();
    assert_eq!(kinds, vec![BlockKind::Blank, BlockKind::Eof]);
    assert_eq!(literals(&scan), vec!["<!-- `a` -->", "text", "<!-- `b` -->"]);
}

#[test]
fn malformed_directives_are_plain_text() {
    let src = "<!-- echo hi -->\n<!-- `echo hi` --> trailing\n  <!-- `echo hi` -->\nprose\n";
    let scan = scan_ok(src);
    assert_eq!(scan.commands().count(), 0);
    assert_eq!(literals(&scan).len(), 4);
}

#[test]
fn filtered_directive_leaves_block_as_content() {
    let options = ScanOptions {
        filter: Filter::new(&[] as &[&str], &["^skip"]).unwrap(),
        ..Default::default()
    };
    let src = "<!-- `skip me` -->\n```\nstale\n```\n<!-- `echo ok` -->\n```\nold\n```\n";
    let scan = scan_with(src, &options).unwrap();
    assert_eq!(
        literals(&scan),
        vec!["<!-- `skip me` -->", "```", "stale", "```", "<!-- `echo ok` -->"]
    );
    assert_eq!(scan.commands().count(), 1);
}

#[test]
fn dry_run_records_directives_without_consuming() {
    let options = ScanOptions {
        dry_run: true,
        ..Default::default()
    };
    let src = "<!-- `echo a` -->\n```\nold\n```\n";
    let scan = scan_with(src, &options).unwrap();
    assert_eq!(scan.commands().count(), 0);
    assert_eq!(scan.dry_run.len(), 1);
    assert_eq!(scan.dry_run[0].command, "echo a");
    assert_eq!(literals(&scan).len(), 4);
}

#[test]
fn unexpected_block_start_is_fatal() {
    let src = "# T\n<!-- `echo hi` -->\nJust prose.\n";
    let err = scan_with(src, &ScanOptions::default()).unwrap_err();
    assert!(err.message.contains("unexpected block start"), "{}", err);
    assert!(err.message.contains("echo hi"));
    assert_eq!(&src[err.span.clone()], "Just prose.");
    assert_eq!(err.labels.len(), 1);
}

#[test]
fn unterminated_fence_is_fatal() {
    let src = "<!-- `echo hi` -->\n```\nold\n";
    let err = scan_with(src, &ScanOptions::default()).unwrap_err();
    assert!(err.message.contains("unterminated"), "{}", err);
    assert_eq!(&src[err.span.clone()], "```");
}

#[test]
fn unterminated_html_is_fatal() {
    let src = "<!-- `echo hi` -->\n<pre>\nold\n</div>\n";
    let err = scan_with(src, &ScanOptions::default()).unwrap_err();
    assert!(err.notes.iter().any(|n| n.contains("</pre>")));
}

#[test]
fn unbalanced_quotes_are_fatal() {
    let err = scan_with("<!-- `echo 'oops` -->\n\n", &ScanOptions::default()).unwrap_err();
    assert!(err.message.contains("cannot split"), "{}", err);
}

#[test]
fn error_converts_to_diagnostic() {
    let err = scan_with("<!-- `x` -->\nprose\n", &ScanOptions::default()).unwrap_err();
    let diagnostic = err.to_diagnostic();
    assert_eq!(diagnostic.labels.len(), 2);
    assert_eq!(diagnostic.notes.len(), 1);
}

// ---------------------------------------------------------------------------
// Rendering replacements
// ---------------------------------------------------------------------------

fn block(kind: BlockKind, lines: &[&str]) -> Block {
    Block {
        kind,
        lines: lines.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn fenced_output_keeps_delimiters() {
    let b = block(BlockKind::Fenced { double: false }, &["```text", "old", "```"]);
    assert_eq!(b.render(Some("hi\n")), vec!["```text", "hi", "```"]);
}

#[test]
fn self_fenced_output_replaces_whole_block() {
    let b = block(BlockKind::Fenced { double: false }, &["```bash", "old", "```"]);
    let out = "```bash\necho hi\n# hi\n```\n";
    assert_eq!(b.render(Some(out)), vec!["```bash", "echo hi", "# hi", "```"]);
}

#[test]
fn html_output_wrapping() {
    let b = block(BlockKind::Html { tag: "pre".into() }, &["<pre>", "old", "</pre>"]);
    assert_eq!(b.render(Some("new")), vec!["<pre>", "new", "</pre>"]);
    assert_eq!(
        b.render(Some("<pre class=\"x\">\nnew\n</pre>\n")),
        vec!["<pre class=\"x\">", "new", "</pre>"]
    );
    assert_eq!(
        b.render(Some("<details>\nx\n</details>")),
        vec!["<pre>", "<details>", "x", "</details>", "</pre>"]
    );
}

#[test]
fn inline_html_rows_stay_inside_their_container() {
    let b = block(
        BlockKind::Html { tag: "table".into() },
        &["<table>", "old", "</table>"],
    );
    let rows = "<tr><td>1</td></tr>\n<tr><td>2</td></tr>\n";
    let rendered = b.render(Some(rows));
    assert_eq!(
        rendered,
        vec!["<table>", "<tr><td>1</td></tr>", "<tr><td>2</td></tr>", "</table>"]
    );

    let rescanned = scan_ok(&format!("<!-- `rows` -->\n{}\n", rendered.join("\n")));
    assert_eq!(only_block(&rescanned).lines, rendered);
}

#[test]
fn unclosed_fence_in_output_is_wrapped() {
    let b = block(BlockKind::Fenced { double: false }, &["```", "old", "```"]);
    let rendered = b.render(Some("```sh\nls\n"));
    assert_eq!(rendered, vec!["```", "```sh", "ls", "```"]);

    let rescanned = scan_ok(&format!("<!-- `snippet` -->\n{}\n", rendered.join("\n")));
    assert_eq!(only_block(&rescanned).lines, rendered);
}

#[test]
fn fenced_output_must_end_on_its_closer() {
    let b = block(BlockKind::Fenced { double: false }, &["```", "old", "```"]);
    let closed = "```sh\nls\n```\n";
    assert_eq!(b.render(Some(closed)), vec!["```sh", "ls", "```"]);
    let trailing: Vec<String> = ["```sh", "ls", "```", "after"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert!(!b.kind.encloses(&trailing));
}

#[test]
fn double_fenced_output_replaces_both_fences() {
    let b = block(
        BlockKind::Fenced { double: true },
        &["```bash", "old", "```", "```", "old", "```"],
    );
    let out = "```bash\nseq 2\n```\n```\n1\n2\n```\n";
    assert_eq!(
        b.render(Some(out)),
        vec!["```bash", "seq 2", "```", "```", "1", "2", "```"]
    );
    // One fence is not enough to stand in for a double block.
    assert_eq!(
        b.render(Some("```\n1\n```\n")),
        vec!["```bash", "```", "1", "```", "```"]
    );
}

#[test]
fn empty_output_inside_fence() {
    let b = block(BlockKind::Fenced { double: false }, &["```", "old", "```"]);
    assert_eq!(b.render(Some("")), vec!["```", "```"]);
}

#[test]
fn list_and_blank_rendering() {
    let list = block(BlockKind::List, &["- old", ""]);
    assert_eq!(list.render(Some("- a\n- b\n")), vec!["- a", "- b", ""]);

    let blank = block(BlockKind::Blank, &[""]);
    assert_eq!(blank.render(Some("- a")), vec!["- a", ""]);

    let eof = block(BlockKind::Eof, &[]);
    assert_eq!(eof.render(Some("- a")), vec!["- a", ""]);
}

#[test]
fn replacement_lines_ignore_every_trailing_newline() {
    assert_eq!(replacement_lines("a\n\n\n"), vec!["a"]);
    assert!(replacement_lines("\n").is_empty());
    assert!(replacement_lines("").is_empty());
}

#[test]
fn failed_command_leaves_block_unchanged() {
    let b = block(BlockKind::Fenced { double: false }, &["```", "old", "```"]);
    assert_eq!(b.render(None), vec!["```", "old", "```"]);
    assert!(block(BlockKind::Eof, &[]).render(None).is_empty());
}

#[test]
fn document_lines_and_spans() {
    let doc = Document::parse("a\r\nbc\nd", 7);
    assert_eq!(doc.len(), 3);
    assert_eq!(doc.lines[0].text, "a\r");
    assert_eq!(doc.lines[1].span, 3..5);
    assert_eq!(doc.lines[2].text, "d");
    assert_eq!(doc.lines[2].number, 3);
    assert_eq!(doc.source_id, 7);
    assert!(Document::parse("", 0).is_empty());
}
