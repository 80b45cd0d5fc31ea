use facewatch_controller::render::escape_html as escape;
use facewatch_controller::ui::UiState;

/// Full console page. Element ids are the contract the page's controls and
/// any external scripts rely on.
pub fn index_html(state: &UiState, camera_url: &str, refresh_secs: u64) -> String {
    let alerts: String = state
        .alerts
        .iter()
        .map(|a| format!("<li class=\"alert\">{}</li>", escape(a)))
        .collect();
    let dismiss = if state.alerts.is_empty() {
        String::new()
    } else {
        r#"<form method="post" action="/alerts/dismiss"><button type="submit">Dismiss</button></form>"#
            .to_string()
    };
    let video = if state.active {
        format!(r#"<img id="video" src="{}" alt="Camera"/>"#, escape(camera_url))
    } else {
        r#"<img id="video" alt="Camera off"/>"#.to_string()
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<meta http-equiv="refresh" content="{refresh_secs}"/>
<title>facewatch</title>
</head>
<body>
{video}
<form method="post" action="/start"><button id="startBtn" type="submit">Start</button></form>
<form method="post" action="/stop"><button id="stopBtn" type="submit">Stop</button></form>
<p id="status">{status}</p>
<ul id="alerts">{alerts}</ul>
{dismiss}
<div id="results">{results}</div>
<audio id="alertSound" preload="none"></audio>
</body>
</html>
"#,
        status = escape(&state.status),
        results = state.results_html,
    )
}
