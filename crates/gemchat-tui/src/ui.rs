use std::time::Instant;

use gemchat_core::{ChatMessage, ChatRole, ConcurrencyMode};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::App;

const USER_AVATAR: &str = "◉";
const MODEL_AVATAR: &str = "✦";
const SEND_WIDTH: u16 = 10;

/// Screen regions, shared by rendering and mouse hit-testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatLayout {
    pub header: Rect,
    pub messages: Rect,
    pub status: Rect,
    pub input: Rect,
    pub send: Rect,
    pub footer: Rect,
}

impl ChatLayout {
    pub fn new(area: Rect) -> Self {
        let [header, messages, status, input_row, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(area);

        let [input, send] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(SEND_WIDTH),
        ])
        .areas(input_row);

        Self { header, messages, status, input, send, footer }
    }
}

/// Check if a point is within a rectangle
pub fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("**") else {
            break;
        };
        if end == 0 {
            // "****" is not a bold span
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after_open[2..];
            continue;
        }

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after_open[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

fn message_header(msg: &ChatMessage) -> Line<'static> {
    let time = msg
        .timestamp
        .map(|t| format!(" · {}", t.format("%H:%M")))
        .unwrap_or_default();
    let time_style = Style::default().fg(Color::DarkGray);

    match msg.role {
        ChatRole::User => Line::from(vec![
            Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(time, time_style),
            Span::raw(" "),
            Span::styled(USER_AVATAR, Style::default().fg(Color::Cyan)),
        ])
        .alignment(Alignment::Right),
        ChatRole::Model => Line::from(vec![
            Span::styled(MODEL_AVATAR, Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            Span::styled("Gemini", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::styled(time, time_style),
        ]),
    }
}

/// Every line of the transcript pane: bubbles, then typing indicators
fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.session.conversation().messages() {
        lines.push(message_header(msg));
        match msg.role {
            ChatRole::User => {
                for line in msg.content.lines() {
                    lines.push(
                        Line::from(line.to_string())
                            .style(Style::default().fg(Color::Cyan))
                            .alignment(Alignment::Right),
                    );
                }
            }
            ChatRole::Model => {
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    // One indicator per pending request
    let pending = app.session.pending();
    let show_ids = pending.mode() == ConcurrencyMode::Multiple && pending.count() > 1;
    let dots = ".".repeat((app.animation_frame as usize) + 1);
    for id in pending.in_flight() {
        let label = if show_ids {
            format!("Gemini is typing{} ({})", dots, id)
        } else {
            format!("Gemini is typing{}", dots)
        };
        lines.push(Line::from(vec![
            Span::styled(MODEL_AVATAR, Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            Span::styled(
                label,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    lines
}

/// The transcript pane's contents, without the surrounding block.
///
/// Rendering and scroll limits both go through this so they wrap the same way.
fn transcript_paragraph(app: &App) -> Paragraph<'static> {
    let lines = transcript_lines(app);
    let text = if lines.is_empty() {
        Text::from(Span::styled(
            "Say hello to Gemini...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(lines)
    };

    Paragraph::new(text).wrap(Wrap { trim: false })
}

/// Rows the transcript occupies once wrapped to `width` columns
pub fn transcript_height(app: &App, width: u16) -> u16 {
    let rows = transcript_paragraph(app).line_count(width.max(1));
    rows.min(u16::MAX as usize) as u16
}

pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();
    let layout = ChatLayout::new(area);

    render_header(app, frame, layout.header);
    render_messages(app, frame, layout.messages);
    render_status(app, frame, layout.status);
    render_input(app, frame, layout.input);
    render_send_button(app, frame, layout.send);
    render_footer(app, frame, layout.footer);

    if let Some(notice) = app.alert {
        render_alert(notice.message(), frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let [title_area, menu_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(4)]).areas(area);

    let title = Line::from(vec![
        Span::styled(format!(" {} Chat ", MODEL_AVATAR), Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.model_name().to_string(), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, title_area);

    let menu = Paragraph::new("···")
        .style(Style::default().bg(Color::DarkGray).fg(Color::Gray));
    frame.render_widget(menu, menu_area);
}

fn render_messages(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let chat = transcript_paragraph(app)
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    if app.session.sent_notice_visible(Instant::now()) {
        let banner = Paragraph::new(Line::from(Span::styled(
            " ✓ Message sent",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        frame.render_widget(banner, area);
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Message ");

    let draft = app.session.draft();
    if draft.is_empty() {
        let placeholder = Paragraph::new("Type your message...")
            .style(Style::default().fg(Color::DarkGray))
            .block(input_block);
        frame.render_widget(placeholder, area);
    } else {
        // Horizontal scrolling keeps the cursor visible
        let inner_width = area.width.saturating_sub(2) as usize;
        let scroll_offset = if inner_width == 0 {
            0
        } else if app.cursor >= inner_width {
            app.cursor - inner_width + 1
        } else {
            0
        };

        let visible_text: String = draft.chars().skip(scroll_offset).take(inner_width).collect();
        let input = Paragraph::new(visible_text)
            .style(Style::default().fg(Color::Cyan))
            .block(input_block);
        frame.render_widget(input, area);
    }

    if app.alert.is_none() {
        let inner_width = area.width.saturating_sub(2) as usize;
        let cursor_x = if inner_width == 0 {
            0
        } else {
            app.cursor.min(inner_width - 1)
        };
        frame.set_cursor_position((area.x + cursor_x as u16 + 1, area.y + 1));
    }
}

fn render_send_button(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.session.can_send();
    let style = if enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let button = Paragraph::new(Line::from("➤ Send"))
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL).border_style(style));
    frame.render_widget(button, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.alert.is_some() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" dismiss ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ]
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_alert(message: &str, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = 6.min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Notice ");

    let text = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let popup = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(popup, popup_area);
}
