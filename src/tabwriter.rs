//! Elastic column alignment for the printer's intermediate stream.
//!
//! The printer emits `\v` between cells it wants aligned and `\f` where a
//! column block must end no matter what. This pass groups consecutive lines
//! that have at least two cells and identical leading-tab indentation,
//! computes per-column widths over each group, and pads. Columns that are
//! empty on every line of a group are discarded. Text between 0xFF escape
//! bytes is opaque: never split, never trimmed.

/// Delimits literal text that the alignment pass must pass through.
pub const ESCAPE: u8 = 0xff;

#[derive(Default)]
struct Cell {
    bytes: Vec<u8>,
    /// Bytes below this index came from an escaped region and survive
    /// trailing-whitespace trimming.
    protected_len: usize,
}

#[derive(Default)]
struct Line {
    indent: usize,
    cells: Vec<Cell>,
    /// Ended with `\f`: no alignment group may extend past this line.
    hard: bool,
    terminated: bool,
}

fn parse(input: &[u8]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut cell = Cell::default();
    let mut in_escape = false;

    for &b in input {
        if b == ESCAPE {
            in_escape = !in_escape;
            if !in_escape {
                cell.protected_len = cell.bytes.len();
            }
            continue;
        }
        if in_escape {
            cell.bytes.push(b);
            continue;
        }
        match b {
            b'\n' | b'\x0c' => {
                line.cells.push(std::mem::take(&mut cell));
                line.hard = b == b'\x0c';
                line.terminated = true;
                lines.push(std::mem::take(&mut line));
            }
            b'\x0b' => line.cells.push(std::mem::take(&mut cell)),
            b'\t' if line.cells.is_empty() && cell.bytes.is_empty() => line.indent += 1,
            _ => cell.bytes.push(b),
        }
    }
    if !cell.bytes.is_empty() || !line.cells.is_empty() || line.indent > 0 {
        line.cells.push(cell);
        lines.push(line);
    }
    lines
}

fn display_width(bytes: &[u8]) -> usize {
    String::from_utf8_lossy(bytes).chars().count()
}

fn trimmed(cell: &Cell) -> &[u8] {
    let mut end = cell.bytes.len();
    while end > cell.protected_len && matches!(cell.bytes[end - 1], b' ' | b'\t' | b'\x0b') {
        end -= 1;
    }
    &cell.bytes[..end]
}

fn emit_plain(line: &Line, out: &mut Vec<u8>) {
    let mut content = Vec::new();
    let last = line.cells.len().saturating_sub(1);
    for (k, cell) in line.cells.iter().enumerate() {
        if k > 0 {
            content.push(b' ');
        }
        if k == last {
            content.extend_from_slice(trimmed(cell));
        } else {
            content.extend_from_slice(&cell.bytes);
        }
    }
    if !content.is_empty() {
        for _ in 0..line.indent {
            out.push(b'\t');
        }
        out.extend_from_slice(&content);
    }
    if line.terminated {
        out.push(b'\n');
    }
}

fn emit_block(lines: &[Line], padchar: u8, out: &mut Vec<u8>) {
    let ncols = lines.iter().map(|l| l.cells.len()).max().unwrap_or(1) - 1;
    let mut widths = vec![0usize; ncols];
    let mut discard = vec![true; ncols];
    for l in lines {
        for k in 0..l.cells.len() - 1 {
            widths[k] = widths[k].max(display_width(&l.cells[k].bytes));
            if !l.cells[k].bytes.is_empty() {
                discard[k] = false;
            }
        }
    }

    for l in lines {
        for _ in 0..l.indent {
            out.push(b'\t');
        }
        let last = l.cells.len() - 1;
        for (k, cell) in l.cells.iter().enumerate() {
            if k < last && discard[k] {
                continue;
            }
            if k == last {
                out.extend_from_slice(trimmed(cell));
            } else {
                out.extend_from_slice(&cell.bytes);
                if padchar == b' ' {
                    let pad = widths[k] + 1 - display_width(&cell.bytes);
                    out.extend(std::iter::repeat(b' ').take(pad));
                } else {
                    out.push(b'\t');
                }
            }
        }
        if l.terminated {
            out.push(b'\n');
        }
    }
}

/// Resolves alignment cells into padded columns.
pub fn format(input: &[u8], padchar: u8) -> Vec<u8> {
    let lines = parse(input);
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < lines.len() {
        if lines[i].cells.len() >= 2 {
            let indent = lines[i].indent;
            let mut j = i + 1;
            while j < lines.len()
                && lines[j].cells.len() >= 2
                && lines[j].indent == indent
                && !lines[j - 1].hard
            {
                j += 1;
            }
            emit_block(&lines[i..j], padchar, &mut out);
            i = j;
        } else {
            emit_plain(&lines[i], &mut out);
            i += 1;
        }
    }
    out
}

/// No alignment: cell separators collapse to single blanks, section breaks
/// to newlines, escapes are stripped, trailing whitespace trimmed.
pub fn raw(input: &[u8]) -> Vec<u8> {
    let lines = parse(input);
    let mut out = Vec::with_capacity(input.len());
    for line in &lines {
        emit_plain(line, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(s: &str) -> String {
        String::from_utf8(format(s.as_bytes(), b' ')).unwrap()
    }

    #[test]
    fn aligns_columns() {
        let input = "\tName\x0bstring\n\tId\x0bint64\n";
        assert_eq!(fmt(input), "\tName string\n\tId   int64\n");
    }

    #[test]
    fn ragged_rows_pad_shared_columns_only() {
        let input = "\ta\x0bbb\x0btag\n\tlong\x0bc\n";
        assert_eq!(fmt(input), "\ta    bb tag\n\tlong c\n");
    }

    #[test]
    fn indent_change_splits_groups() {
        let input = "\ta\x0bbb\n\t\tx\x0by\n\t\tlong\x0bz\n";
        assert_eq!(fmt(input), "\ta bb\n\t\tx    y\n\t\tlong z\n");
    }

    #[test]
    fn formfeed_breaks_group_and_becomes_newline() {
        let input = "\ta\x0bb\x0c\tlonger\x0bc\n";
        assert_eq!(fmt(input), "\ta b\n\tlonger c\n");
    }

    #[test]
    fn single_cell_line_flushes_group() {
        let input = "\ta\x0bb\n\t}\n\tlonger\x0bc\n";
        assert_eq!(fmt(input), "\ta b\n\t}\n\tlonger c\n");
    }

    #[test]
    fn trailing_whitespace_trimmed_but_escaped_kept() {
        let input = "x \t\n";
        assert_eq!(fmt(input), "x\n");

        let mut escaped = vec![ESCAPE];
        escaped.extend_from_slice(b"`tab\t`");
        escaped.push(ESCAPE);
        escaped.push(b'\n');
        assert_eq!(format(&escaped, b' '), b"`tab\t`\n");
    }

    #[test]
    fn blank_line_loses_indent() {
        let input = "\t\n\tx\n";
        assert_eq!(fmt(input), "\n\tx\n");
    }

    #[test]
    fn all_empty_column_is_discarded() {
        let input = "\t\x0ba\x0bb\n\t\x0bcc\x0bd\n";
        assert_eq!(fmt(input), "\ta  b\n\tcc d\n");
    }

    #[test]
    fn raw_mode_collapses_cells() {
        let input = "\tName\x0bstring\x0cx\n";
        assert_eq!(String::from_utf8(raw(input.as_bytes())).unwrap(), "\tName string\nx\n");
    }
}
