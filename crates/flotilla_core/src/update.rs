use crate::{Effect, Msg, Phase, ProgressState};

/// Pure update function: applies a message to state and returns any effects.
///
/// Once the state has exited every message is ignored, so late worker
/// updates are harmless.
pub fn update(mut state: ProgressState, msg: Msg) -> (ProgressState, Vec<Effect>) {
    if state.phase() == Phase::Exited {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::SetPercentage { row, percentage } => {
            state.set_percentage(row, percentage);
            Vec::new()
        }
        Msg::SetStatus { row, status } => {
            state.set_status(row, status);
            Vec::new()
        }
        Msg::SetText { row, text } => {
            state.set_text(row, text);
            Vec::new()
        }
        Msg::SetContent { row, content } => {
            state.set_content(row, content);
            Vec::new()
        }
        Msg::Finish => {
            state.mark_completed();
            Vec::new()
        }
        Msg::Tick => {
            let animating = state.advance_animations();
            if state.is_completed() && !animating {
                state.exit();
                vec![Effect::Quit]
            } else {
                if state.is_completed() {
                    state.mark_draining();
                }
                if state.consume_dirty() || animating {
                    vec![Effect::Render]
                } else {
                    Vec::new()
                }
            }
        }
        Msg::Interrupt => {
            state.begin_quit();
            vec![Effect::Interrupt]
        }
        Msg::Suspend => vec![Effect::Suspend],
        Msg::Resumed => {
            state.mark_dirty();
            Vec::new()
        }
    };

    (state, effects)
}
