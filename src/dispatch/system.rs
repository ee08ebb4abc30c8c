//! Alarms, apps, email, calls and volume.

use super::{HandlerContext, Reply};
use crate::error::{OrionError, Result};
use crate::intent::Command;
use crate::store::document::parse_local_time;

const DEFAULT_VOLUME: i64 = 50;

pub(super) fn set_alarm(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let raw = cmd.require_str("time")?;
    let at = parse_local_time(&raw).ok_or_else(|| {
        OrionError::InvalidArgument(format!("'{raw}' is not a YYYY-MM-DD HH:MM time"))
    })?;
    let label = cmd.str_arg("label").unwrap_or_else(|| "Alarm".to_owned());
    ctx.actions.set_alarm(at, &label).map(Reply::Confirm)
}

pub(super) fn open_app(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let name = cmd.str_arg("name").or_else(|| cmd.str_arg("app"));
    let name = name.ok_or_else(|| OrionError::InvalidArgument("missing 'name'".into()))?;
    ctx.actions.open_app(&name).map(Reply::Confirm)
}

pub(super) fn close_app(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let name = cmd.str_arg("name").or_else(|| cmd.str_arg("app"));
    let name = name.ok_or_else(|| OrionError::InvalidArgument("missing 'name'".into()))?;
    ctx.actions.close_app(&name).map(Reply::Confirm)
}

pub(super) fn send_email(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let to = cmd.require_str("to")?;
    let subject = cmd.str_arg("subject").unwrap_or_default();
    let body = cmd.str_arg("body").unwrap_or_default();
    ctx.actions.send_email(&to, &subject, &body).map(Reply::Confirm)
}

pub(super) fn call_number(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let number = cmd.require_str("number")?;
    ctx.actions.call_number(&number).map(Reply::Confirm)
}

pub(super) fn set_volume(ctx: &HandlerContext, cmd: &Command) -> Result<Reply> {
    let percent = cmd.int_arg("percent")?.unwrap_or(DEFAULT_VOLUME).clamp(0, 100);
    let percent = u8::try_from(percent).unwrap_or(100);
    ctx.actions.set_volume(percent).map(Reply::Confirm)
}
