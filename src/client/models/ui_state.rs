// Inline feedback for user-triggered actions (form submits, accept/reject, delete).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub busy: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl UiState {
    pub fn start(&mut self) {
        self.busy = true;
        self.error = None;
        self.notice = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.busy = false;
        self.error = Some(message.into());
    }

    pub fn succeed(&mut self, notice: impl Into<String>) {
        self.busy = false;
        self.notice = Some(notice.into());
    }
}
