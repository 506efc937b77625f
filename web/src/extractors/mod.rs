pub(crate) mod cookie_session;
