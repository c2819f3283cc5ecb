use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;
use crate::ui::point_in_rect;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(w, h) => {
            app.viewport = Rect::new(0, 0, w, h);
        }
        AppEvent::Tick => app.tick(Instant::now()),
        AppEvent::Reply { id, outcome } => app.on_reply(id, outcome),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // An open notice swallows everything until dismissed
    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_alert();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.send(),

        // Draft editing
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.insert_char(c);
        }

        // Transcript scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => {
            let page = app.half_page();
            app.scroll_up(page);
        }
        KeyCode::PageDown => {
            let page = app.half_page();
            app.scroll_down(page);
        }

        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.alert.is_some() {
        return;
    }

    let x = mouse.column;
    let y = mouse.row;
    let layout = app.layout();

    match mouse.kind {
        MouseEventKind::ScrollDown if point_in_rect(x, y, layout.messages) => app.scroll_down(3),
        MouseEventKind::ScrollUp if point_in_rect(x, y, layout.messages) => app.scroll_up(3),
        MouseEventKind::Down(MouseButton::Left) if point_in_rect(x, y, layout.send) => {
            // A disabled send control ignores clicks
            if app.session.can_send() {
                app.send();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use gemchat_core::{MockBackend, Notice, SessionSettings};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(MockBackend::new()), SessionSettings::default(), None, tx);
        app.viewport = Rect::new(0, 0, 80, 24);
        (app, rx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).unwrap();
        }
    }

    fn click(x: u16, y: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: x,
            row: y,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[tokio::test]
    async fn test_enter_sends_and_reply_lands() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "Hello");
        assert_eq!(app.session.draft(), "Hello");

        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(!app.session.can_send());

        let reply = rx.recv().await.unwrap();
        handle_event(&mut app, reply).unwrap();

        let messages = app.session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(messages[1].content, "Mock answer");
        assert_eq!(app.session.draft(), "");
    }

    #[tokio::test]
    async fn test_enter_on_empty_draft_alerts() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.alert, Some(Notice::PromptRequired));
        assert!(app.session.conversation().is_empty());

        // Typing is swallowed while the notice is open
        type_text(&mut app, "abc");
        assert_eq!(app.session.draft(), "");

        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.alert.is_none());
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_second_enter_while_pending_is_ignored() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "first");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        type_text(&mut app, "X");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.session.pending().count(), 1);
        assert!(app.alert.is_none());

        let reply = rx.recv().await.unwrap();
        handle_event(&mut app, reply).unwrap();
        assert!(app.session.can_send());
        assert_eq!(app.session.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_click_on_send_control() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "Hi");
        let send = app.layout().send;

        handle_event(&mut app, click(send.x + 1, send.y + 1)).unwrap();
        assert!(app.session.pending().is_any_pending());

        // Clicking the disabled control does nothing
        handle_event(&mut app, click(send.x + 1, send.y + 1)).unwrap();
        assert_eq!(app.session.pending().count(), 1);

        let reply = rx.recv().await.unwrap();
        handle_event(&mut app, reply).unwrap();
        assert!(!app.session.pending().is_any_pending());
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _rx) = test_app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                kind: KeyEventKind::Press,
                state: KeyEventState::NONE,
            }),
        )
        .unwrap();
        assert!(app.should_quit);
        assert_eq!(app.session.draft(), "");

        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_resize_updates_viewport() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, AppEvent::Resize(120, 40)).unwrap();
        assert_eq!(app.viewport, Rect::new(0, 0, 120, 40));
    }
}
