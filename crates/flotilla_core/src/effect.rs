/// Side effects requested by [`crate::update`]; executed by the loop that owns the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Repaint every row.
    Render,
    /// Work is finished and every bar has settled: paint the last frame and stop.
    Quit,
    /// User interrupt: tear down immediately without painting.
    Interrupt,
    /// Hand the terminal back and suspend the process.
    Suspend,
}
