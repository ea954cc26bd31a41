pub mod form;
pub mod list;
pub mod widgets;

/// Navigation context for rendered links and form actions. The original read
/// these from ambient request globals; here the caller passes them in.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub modname: String,
    pub can_edit: bool,
}
