use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use psp_connectors::connector::ConnectorTaskTree;

use crate::app::*;

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();
    f.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(area);

    draw_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(30)])
        .split(chunks[1]);
    draw_connector_list(f, app, body[0]);
    draw_details(f, app, body[1]);

    draw_log(f, app, chunks[2]);

    let help = Paragraph::new("↑↓ select  r run cycle  x reset states  q quit")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let dur = app.session_duration();
    let installed = app.connectors.iter().filter(|c| c.install.is_some()).count();

    let header = Paragraph::new(Line::from(vec![
        Span::styled("  psp-workbench ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            format!("{installed}/{} installed", app.connectors.len()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" │ {}m {}s", dur.num_minutes(), dur.num_seconds() % 60)),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Green)));
    f.render_widget(header, area);
}

fn draw_connector_list(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::with_capacity(app.connectors.len());
    for (i, view) in app.connectors.iter().enumerate() {
        let marker = if i == app.selected { "▸ " } else { "  " };
        let (badge, color) = if view.error.is_some() {
            ("✗", Color::Red)
        } else if view.running() {
            ("…", Color::Yellow)
        } else {
            ("✓", Color::Green)
        };
        let style = if i == app.selected {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker}{badge} "), Style::default().fg(color)),
            Span::styled(format!("{} ({})", view.instance.name, view.instance.provider), style),
        ]));
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" connectors "));
    f.render_widget(p, area);
}

fn draw_details(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" details ");
    let Some(view) = app.current() else {
        let p = Paragraph::new(Span::styled(
            "No connectors configured",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        f.render_widget(p, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Provider: ", Style::default().fg(Color::Yellow)),
            Span::raw(view.instance.provider.clone()),
            Span::styled("  Page size: ", Style::default().fg(Color::Yellow)),
            Span::raw(view.page_size.to_string()),
        ]),
    ];

    if let Some(err) = &view.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
        f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block), area);
        return;
    }

    if let Some(install) = &view.install {
        let capabilities: Vec<String> = install.capabilities.iter().map(|c| format!("{c:?}")).collect();
        lines.push(Line::from(vec![
            Span::styled("Polling: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}s", install.polling_period.duration().as_secs())),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Capabilities: ", Style::default().fg(Color::Yellow)),
            Span::raw(capabilities.join(", ")),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Workflow",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )));
    for task in view.workflow() {
        push_task(&mut lines, view, task, &task.name, 0);
    }

    if let Some(summary) = &view.last_summary {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "Last cycle: {} items, {} webhook configs, {} failures",
                summary.total(),
                summary.webhook_configs,
                summary.failures
            ),
            Style::default().fg(Color::Green),
        )));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}

fn push_task(lines: &mut Vec<Line<'static>>, view: &ConnectorView, task: &ConnectorTaskTree, path: &str, depth: usize) {
    // Child states are keyed per parent, so count every state under this path.
    let states = view.states.as_ref().map_or(0, |states| {
        states
            .keys()
            .filter(|k| k.as_str() == path || k.starts_with(&format!("{path}@")))
            .count()
    });
    let periodic = if task.periodically { " ⟳" } else { "" };
    lines.push(Line::from(vec![
        Span::raw(format!("{}• {}{periodic}", "  ".repeat(depth), task.name)),
        Span::styled(format!("  [{states} states]"), Style::default().fg(Color::DarkGray)),
    ]));
    for child in &task.next_tasks {
        push_task(lines, view, child, &format!("{path}/{}", child.name), depth + 1);
    }
}

fn draw_log(f: &mut Frame, app: &App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = app
        .log
        .iter()
        .skip(app.log.len().saturating_sub(height))
        .map(|l| Line::from(Span::styled(l.clone(), Style::default().fg(Color::White))))
        .collect();

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" activity ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(p, area);
}
