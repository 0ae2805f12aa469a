use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Cell, Paragraph, Row, Table, TableState};

use crate::ui::manager::{Focus, ProductManager};

const HINTS: &str =
    "tab focus · enter submit/edit · e edit · d delete · r refresh · esc cancel · q quit";

pub fn draw(frame: &mut Frame, manager: &ProductManager) {
    let [banner_area, form_area, list_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(5),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_banner(frame, banner_area, manager);
    draw_form(frame, form_area, manager);
    draw_list(frame, list_area, manager);
    frame.render_widget(
        Paragraph::new(HINTS).style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );
}

fn draw_banner(frame: &mut Frame, area: Rect, manager: &ProductManager) {
    // Error wins when both are present; in practice setting one clears the
    // other, so this only breaks ties inside a single frame.
    let banner = if let Some(error) = &manager.error {
        Some((error.text(), Color::Red))
    } else {
        manager.success.as_ref().map(|s| (s.text(), Color::Green))
    };
    if let Some((text, color)) = banner {
        frame.render_widget(
            Paragraph::new(text).style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
            area,
        );
    }
}

fn draw_form(frame: &mut Frame, area: Rect, manager: &ProductManager) {
    let title = match &manager.editing {
        Some(product) => format!("Editing #{}", product.id),
        None => "New product".to_string(),
    };
    let block = Block::bordered().title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        field_line("Name", &manager.form.name, manager.focus == Focus::Name),
        field_line(
            "Description",
            &manager.form.description,
            manager.focus == Focus::Description,
        ),
        field_line("Price", &manager.form.price, manager.focus == Focus::Price),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn field_line<'a>(label: &'a str, value: &'a str, focused: bool) -> Line<'a> {
    let value_style = if focused {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label:>12}: "), Style::default().fg(Color::Cyan)),
        Span::styled(value.to_string(), value_style),
        Span::raw(cursor),
    ])
}

fn draw_list(frame: &mut Frame, area: Rect, manager: &ProductManager) {
    let block = Block::bordered().title(format!("Productos ({})", manager.products.len()));
    let rows: Vec<Row> = manager
        .products
        .iter()
        .map(|product| {
            Row::new(vec![
                Cell::from(product.id.to_string()),
                Cell::from(product.name.clone()),
                Cell::from(product.description.clone()),
                Cell::from(format!("${:.2}", product.price)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(24),
            Constraint::Min(20),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["id", "name", "description", "price"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block)
    .highlight_style(highlight_style(manager));

    let mut state = TableState::default();
    if !manager.products.is_empty() {
        state.select(Some(manager.selected.min(manager.products.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn highlight_style(manager: &ProductManager) -> Style {
    if manager.focus == Focus::List {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}
