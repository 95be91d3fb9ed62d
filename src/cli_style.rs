use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

pub fn get_styles() -> Styles {
    let accent = Some(Color::Ansi(AnsiColor::Yellow));
    let good = Some(Color::Ansi(AnsiColor::Green));
    let bad = Some(Color::Ansi(AnsiColor::Red));

    Styles::styled()
        .usage(Style::new().bold().underline().fg_color(accent))
        .header(Style::new().bold().underline().fg_color(accent))
        .literal(Style::new().bold().fg_color(good))
        .invalid(Style::new().bold().fg_color(bad))
        .error(Style::new().bold().fg_color(bad))
        .valid(Style::new().bold().fg_color(good))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

pub mod colors {
    use crossterm::style::Color;

    pub const GOLD: Color = Color::Rgb {
        r: 255,
        g: 196,
        b: 0,
    };
    pub const AMBER: Color = Color::Rgb {
        r: 255,
        g: 140,
        b: 0,
    };
    pub const TEAL: Color = Color::Rgb {
        r: 0,
        g: 190,
        b: 170,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 0,
        g: 220,
        b: 120,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

mod box_chars {
    pub const DOUBLE_TOP_LEFT: &str = "╔";
    pub const DOUBLE_TOP_RIGHT: &str = "╗";
    pub const DOUBLE_BOTTOM_LEFT: &str = "╚";
    pub const DOUBLE_BOTTOM_RIGHT: &str = "╝";
    pub const DOUBLE_HORIZONTAL: &str = "═";
    pub const DOUBLE_VERTICAL: &str = "║";

    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";
    pub const TOP_LEFT: &str = "╭";
    pub const TOP_RIGHT: &str = "╮";
    pub const BOTTOM_LEFT: &str = "╰";
    pub const BOTTOM_RIGHT: &str = "╯";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";

    pub const NOTE: &str = "♪";
    pub const BULLET: &str = "●";
    pub const BULLET_EMPTY: &str = "○";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

fn print_banner() {
    let banner = r#"
    ╔╦╗╦╦═╗╔═╗╔═╗╔╦╗╔═╗╦═╗╔═╗
     ║║║╠╦╝║╣ ║   ║ ║ ║╠╦╝╚═╗
    ═╩╝╩╩╚═╚═╝╚═╝ ╩ ╚═╝╩╚═╚═╝
"#;
    let gradient = [colors::GOLD, colors::GOLD, colors::AMBER, colors::AMBER];
    for (i, line) in banner.lines().enumerate() {
        let color = gradient.get(i).copied().unwrap_or(colors::GOLD);
        println!("{}", line.with(color).bold());
    }

    println!(
        "{}",
        "  ─────────────  SONG DIRECTOR STORE  ─────────────".with(colors::DIM)
    );
    println!();
}

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    println!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::AMBER).bold(),
        message.with(colors::AMBER)
    );
}

const SECTION_WIDTH: usize = 60;

pub fn print_section_header(title: &str) {
    let title_width = title.width();
    let left = SECTION_WIDTH.saturating_sub(title_width + 4) / 2;
    let right = SECTION_WIDTH.saturating_sub(title_width + 4 + left);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::TOP_LEFT.with(colors::TEAL),
        box_chars::HORIZONTAL.repeat(left).with(colors::TEAL),
        title.with(colors::TEAL).bold().attribute(Attribute::Italic),
        box_chars::HORIZONTAL.repeat(right).with(colors::TEAL),
        box_chars::TOP_RIGHT.with(colors::TEAL)
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        box_chars::BOTTOM_LEFT.with(colors::TEAL),
        box_chars::HORIZONTAL.repeat(SECTION_WIDTH).with(colors::TEAL),
        box_chars::BOTTOM_RIGHT.with(colors::TEAL)
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::AMBER),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_list_item(item: &str) {
    println!(
        "  {}  {}",
        box_chars::NOTE.with(colors::GOLD),
        item.with(colors::WHITE)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        box_chars::BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

/// Box-drawn table sized to its widest cells.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        TableBuilder {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            col_widths: headers.iter().map(|h| h.width()).collect(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (width, cell) in self.col_widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    fn print_rule(&self, left: &str, middle: &str, right: &str) {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|width| box_chars::HORIZONTAL.repeat(width + 2))
            .collect();
        println!(
            "{}{}{}",
            left.with(colors::TEAL),
            segments.join(middle).with(colors::TEAL),
            right.with(colors::TEAL)
        );
    }

    pub fn print(&self) {
        self.print_rule(box_chars::TOP_LEFT, box_chars::T_TOP, box_chars::TOP_RIGHT);

        print!("{}", box_chars::VERTICAL.with(colors::TEAL));
        for (header, width) in self.headers.iter().zip(&self.col_widths) {
            let padding = width.saturating_sub(header.width());
            print!(
                " {}{} {}",
                header.as_str().with(colors::TEAL).bold(),
                " ".repeat(padding),
                box_chars::VERTICAL.with(colors::TEAL)
            );
        }
        println!();

        self.print_rule(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);

        for row in &self.rows {
            print!("{}", box_chars::VERTICAL.with(colors::TEAL));
            for (i, width) in self.col_widths.iter().enumerate() {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let padding = width.saturating_sub(cell.width());
                print!(
                    " {}{} {}",
                    cell.with(colors::WHITE),
                    " ".repeat(padding),
                    box_chars::VERTICAL.with(colors::TEAL)
                );
            }
            println!();
        }

        self.print_rule(
            box_chars::BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::BOTTOM_RIGHT,
        );
    }
}

pub fn get_prompt() -> String {
    format!("{} ", "♪❯".with(colors::GOLD).bold())
}

/// Banner plus a box listing where each fragment keeps its data.
pub fn print_welcome(stores: &[(&str, String)]) {
    print_banner();

    let box_width: usize = 64;
    let horizontal = box_chars::DOUBLE_HORIZONTAL.repeat(box_width);
    let boxed_line = |content: String, visible_width: usize| {
        println!(
            "  {}{}{}{}",
            box_chars::DOUBLE_VERTICAL.with(colors::AMBER),
            content,
            " ".repeat(box_width.saturating_sub(visible_width)),
            box_chars::DOUBLE_VERTICAL.with(colors::AMBER)
        );
    };

    println!(
        "  {}{}{}",
        box_chars::DOUBLE_TOP_LEFT.with(colors::AMBER),
        horizontal.as_str().with(colors::AMBER),
        box_chars::DOUBLE_TOP_RIGHT.with(colors::AMBER)
    );

    let version = format!("Version {}", env!("CLI_VERSION"));
    boxed_line(
        format!("  {}", version.as_str().with(colors::GREEN)),
        version.width() + 2,
    );
    boxed_line(String::new(), 0);

    for (name, location) in stores {
        let visible = format!("  {}: {}", name, location);
        boxed_line(
            format!("  {} {}", format!("{}:", name).with(colors::DIM), location),
            visible.width(),
        );
    }

    boxed_line(String::new(), 0);
    let help = "  Type 'help' for available commands";
    boxed_line(help.with(colors::DIM).to_string(), help.width());

    println!(
        "  {}{}{}",
        box_chars::DOUBLE_BOTTOM_LEFT.with(colors::AMBER),
        horizontal.as_str().with(colors::AMBER),
        box_chars::DOUBLE_BOTTOM_RIGHT.with(colors::AMBER)
    );
    println!();
}

pub fn print_goodbye() {
    println!();
    println!("  {}", "Goodbye, see you at rehearsal.".with(colors::AMBER).bold());
    println!();
}
