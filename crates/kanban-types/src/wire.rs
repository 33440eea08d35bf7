//! Message vocabulary and its slash-delimited wire encoding.
//!
//! Every payload on the bus is `command/arg1/arg2/...`; list arguments are
//! comma-joined integers. Payloads are decoded exactly once, at the bus
//! boundary, into [`Command`] so agents dispatch with an exhaustive `match`.
//!
//! | Command | Wire form |
//! |---------|-----------|
//! | [`Command::ReceiveOrder`] | `receive_order/{product}/{quantity}` |
//! | [`Command::ReceiveParts`] | `receive_parts/{amounts}` |
//! | [`Command::RestockRequest`] | `send_parts/{line_id}/{factory_id}/{flags}` |
//! | [`Command::SupplierOrder`] | `send_parts/{flags}` |
//! | [`Command::ReceiveProducts`] | `receive_products/{product}/{line_id}/{factory_id}/{quantity}` |
//! | [`Command::UpdateFactory`] | `update_factory/{stock}` |
//! | [`Command::Ready`] | `READY` |

use core::fmt::Write as _;
use core::num::ParseIntError;

use crate::ids::{FactoryId, LineId};

/// Separator between a command and its arguments.
const FIELD_SEPARATOR: char = '/';

/// Separator between the integers of a list argument.
const LIST_SEPARATOR: char = ',';

/// Readiness signal payload.
const READY: &str = "READY";

/// Errors produced while decoding a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The payload was empty.
    #[error("empty payload")]
    Empty,

    /// The command keyword is not part of the vocabulary.
    #[error("unrecognized command `{0}`")]
    UnknownCommand(String),

    /// The command carried the wrong number of arguments.
    #[error("command `{command}` expects {expected} argument(s), got {found}")]
    Arity {
        /// The command keyword.
        command: &'static str,
        /// Expected argument count.
        expected: &'static str,
        /// Argument count actually found.
        found: usize,
    },

    /// An argument was not a valid integer.
    #[error("invalid integer for {field}: `{value}` ({source})")]
    InvalidInteger {
        /// Name of the argument.
        field: &'static str,
        /// The offending text.
        value: String,
        /// Underlying parse failure.
        source: ParseIntError,
    },

    /// A quantity argument was negative.
    #[error("negative {field}: {value}")]
    Negative {
        /// Name of the argument.
        field: &'static str,
        /// The offending value.
        value: i64,
    },
}

/// A decoded bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Production order for one line: build `quantity` units of `product`.
    ReceiveOrder {
        /// 0-based product index.
        product: usize,
        /// Lot size.
        quantity: i64,
    },

    /// Part delivery, per-part amounts indexed by part id. Sent by the
    /// warehouse to a line and by the supplier to the warehouse.
    ReceiveParts {
        /// Amount shipped per part (0 for parts not shipped).
        amounts: Vec<i64>,
    },

    /// A line asks the warehouse to restock the flagged parts.
    RestockRequest {
        /// Requesting line.
        line_id: LineId,
        /// Factory of the requesting line.
        factory_id: FactoryId,
        /// One flag per part; `true` means the part is needed.
        flags: Vec<bool>,
    },

    /// The warehouse asks the supplier to replenish the flagged parts.
    SupplierOrder {
        /// One flag per part; `true` means the part is needed.
        flags: Vec<bool>,
    },

    /// A line finished a production order.
    ReceiveProducts {
        /// 0-based product index.
        product: usize,
        /// Producing line.
        line_id: LineId,
        /// Factory of the producing line.
        factory_id: FactoryId,
        /// Units produced.
        quantity: i64,
    },

    /// Finished-goods snapshot broadcast to every factory.
    UpdateFactory {
        /// Stock per product, indexed by product id.
        stock: Vec<i64>,
    },

    /// The warehouse listener is subscribed and ready.
    Ready,
}

impl Command {
    /// Command keyword as it appears on the wire.
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::ReceiveOrder { .. } => "receive_order",
            Self::ReceiveParts { .. } => "receive_parts",
            Self::RestockRequest { .. } | Self::SupplierOrder { .. } => "send_parts",
            Self::ReceiveProducts { .. } => "receive_products",
            Self::UpdateFactory { .. } => "update_factory",
            Self::Ready => READY,
        }
    }

    /// Encode into the slash-delimited wire form.
    pub fn encode(&self) -> String {
        let mut out = String::from(self.keyword());
        match self {
            Self::ReceiveOrder { product, quantity } => {
                let _ = write!(out, "/{product}/{quantity}");
            }
            Self::ReceiveParts { amounts } => {
                out.push(FIELD_SEPARATOR);
                out.push_str(&join_list(amounts.iter().copied()));
            }
            Self::RestockRequest {
                line_id,
                factory_id,
                flags,
            } => {
                let _ = write!(out, "/{line_id}/{factory_id}/");
                out.push_str(&join_list(flags.iter().map(|&f| i64::from(f))));
            }
            Self::SupplierOrder { flags } => {
                out.push(FIELD_SEPARATOR);
                out.push_str(&join_list(flags.iter().map(|&f| i64::from(f))));
            }
            Self::ReceiveProducts {
                product,
                line_id,
                factory_id,
                quantity,
            } => {
                let _ = write!(out, "/{product}/{line_id}/{factory_id}/{quantity}");
            }
            Self::UpdateFactory { stock } => {
                out.push(FIELD_SEPARATOR);
                out.push_str(&join_list(stock.iter().copied()));
            }
            Self::Ready => {}
        }
        out
    }

    /// Decode a wire payload.
    ///
    /// `send_parts` is overloaded: with one argument it is a supplier order,
    /// with three it is a line's restock request.
    pub fn decode(payload: &str) -> Result<Self, WireError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(WireError::Empty);
        }
        if payload == READY {
            return Ok(Self::Ready);
        }

        let mut fields = payload.split(FIELD_SEPARATOR);
        let keyword = fields.next().unwrap_or_default();
        let args: Vec<&str> = fields.collect();

        match (keyword, args.as_slice()) {
            ("receive_order", [product, quantity]) => Ok(Self::ReceiveOrder {
                product: parse_index("product", product)?,
                quantity: parse_quantity("quantity", quantity)?,
            }),
            ("receive_order", other) => Err(arity("receive_order", "2", other)),

            ("receive_parts", [amounts]) => Ok(Self::ReceiveParts {
                amounts: parse_list("amounts", amounts)?,
            }),
            ("receive_parts", other) => Err(arity("receive_parts", "1", other)),

            ("send_parts", [flags]) => Ok(Self::SupplierOrder {
                flags: parse_flags(flags)?,
            }),
            ("send_parts", [line_id, factory_id, flags]) => Ok(Self::RestockRequest {
                line_id: line_id.parse()?,
                factory_id: factory_id.parse()?,
                flags: parse_flags(flags)?,
            }),
            ("send_parts", other) => Err(arity("send_parts", "1 or 3", other)),

            ("receive_products", [product, line_id, factory_id, quantity]) => {
                Ok(Self::ReceiveProducts {
                    product: parse_index("product", product)?,
                    line_id: line_id.parse()?,
                    factory_id: factory_id.parse()?,
                    quantity: parse_quantity("quantity", quantity)?,
                })
            }
            ("receive_products", other) => Err(arity("receive_products", "4", other)),

            ("update_factory", [stock]) => Ok(Self::UpdateFactory {
                stock: parse_list("stock", stock)?,
            }),
            ("update_factory", other) => Err(arity("update_factory", "1", other)),

            (other, _) => Err(WireError::UnknownCommand(other.to_owned())),
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.encode())
    }
}

fn join_list(values: impl Iterator<Item = i64>) -> String {
    let mut out = String::new();
    for (i, value) in values.enumerate() {
        if i > 0 {
            out.push(LIST_SEPARATOR);
        }
        let _ = write!(out, "{value}");
    }
    out
}

const fn arity(command: &'static str, expected: &'static str, found: &[&str]) -> WireError {
    WireError::Arity {
        command,
        expected,
        found: found.len(),
    }
}

fn parse_int(field: &'static str, text: &str) -> Result<i64, WireError> {
    text.trim()
        .parse::<i64>()
        .map_err(|source| WireError::InvalidInteger {
            field,
            value: text.to_owned(),
            source,
        })
}

fn parse_quantity(field: &'static str, text: &str) -> Result<i64, WireError> {
    let value = parse_int(field, text)?;
    if value < 0 {
        return Err(WireError::Negative { field, value });
    }
    Ok(value)
}

fn parse_index(field: &'static str, text: &str) -> Result<usize, WireError> {
    text.trim()
        .parse::<usize>()
        .map_err(|source| WireError::InvalidInteger {
            field,
            value: text.to_owned(),
            source,
        })
}

fn parse_list(field: &'static str, text: &str) -> Result<Vec<i64>, WireError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(LIST_SEPARATOR)
        .map(|item| parse_int(field, item))
        .collect()
}

fn parse_flags(text: &str) -> Result<Vec<bool>, WireError> {
    Ok(parse_list("flags", text)?
        .into_iter()
        .map(|flag| flag != 0)
        .collect())
}
