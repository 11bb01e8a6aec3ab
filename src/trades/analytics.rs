//! Trade statistics

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::storage::Trade;

/// Reference to a single notable trade
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TradeRef {
    pub id: String,
    pub symbol: String,
    pub pnl: f64,
}

impl From<&Trade> for TradeRef {
    fn from(trade: &Trade) -> Self {
        Self {
            id: trade.id.clone(),
            symbol: trade.symbol.clone(),
            pnl: trade.pnl,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SymbolStats {
    pub symbol: String,
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub average_pnl: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyPnl {
    pub date: NaiveDate,
    pub trades: usize,
    pub pnl: f64,
    /// Running total up to and including this day
    pub cumulative_pnl: f64,
}

/// Summary statistics over a set of trades
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TradeAnalytics {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    /// Percent of trades with positive PnL
    pub win_rate: f64,
    pub total_pnl: f64,
    pub average_pnl: f64,
    pub average_roi: Option<f64>,
    pub gross_profit: f64,
    pub gross_loss: f64,
    /// Gross profit over gross loss; absent without losing trades
    pub profit_factor: Option<f64>,
    pub best_trade: Option<TradeRef>,
    pub worst_trade: Option<TradeRef>,
    pub daily_pnl: Vec<DailyPnl>,
    /// Only filled in for plans with advanced analytics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_symbol: Option<Vec<SymbolStats>>,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 10.0
    }
}

fn per_symbol(trades: &[Trade]) -> Vec<SymbolStats> {
    let mut groups: BTreeMap<&str, (usize, usize, f64)> = BTreeMap::new();
    for trade in trades {
        let entry = groups.entry(trade.symbol.as_str()).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if trade.pnl > 0.0 {
            entry.1 += 1;
        }
        entry.2 += trade.pnl;
    }

    let mut stats: Vec<SymbolStats> = groups
        .into_iter()
        .map(|(symbol, (count, wins, pnl))| SymbolStats {
            symbol: symbol.to_string(),
            trades: count,
            wins,
            win_rate: percent(wins, count),
            total_pnl: pnl,
            average_pnl: pnl / count as f64,
        })
        .collect();
    stats.sort_by(|a, b| b.total_pnl.total_cmp(&a.total_pnl));
    stats
}

fn daily(trades: &[Trade]) -> Vec<DailyPnl> {
    let mut days: BTreeMap<NaiveDate, (usize, f64)> = BTreeMap::new();
    for trade in trades {
        let entry = days.entry(trade.traded_at.date_naive()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += trade.pnl;
    }

    let mut running = 0.0;
    days.into_iter()
        .map(|(date, (count, pnl))| {
            running += pnl;
            DailyPnl {
                date,
                trades: count,
                pnl,
                cumulative_pnl: running,
            }
        })
        .collect()
}

/// Compute statistics; `include_symbols` adds the per-symbol breakdown
pub fn compute_analytics(trades: &[Trade], include_symbols: bool) -> TradeAnalytics {
    let total = trades.len();
    let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
    let losses = trades.iter().filter(|t| t.pnl < 0.0).count();

    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();

    let rois: Vec<f64> = trades.iter().filter_map(|t| t.roi).collect();

    TradeAnalytics {
        total_trades: total,
        wins,
        losses,
        breakeven: total - wins - losses,
        win_rate: percent(wins, total),
        total_pnl,
        average_pnl: if total == 0 { 0.0 } else { total_pnl / total as f64 },
        average_roi: if rois.is_empty() {
            None
        } else {
            Some(rois.iter().sum::<f64>() / rois.len() as f64)
        },
        gross_profit,
        gross_loss,
        profit_factor: if gross_loss > 0.0 {
            Some(gross_profit / gross_loss)
        } else {
            None
        },
        best_trade: trades
            .iter()
            .max_by(|a, b| a.pnl.total_cmp(&b.pnl))
            .map(TradeRef::from),
        worst_trade: trades
            .iter()
            .min_by(|a, b| a.pnl.total_cmp(&b.pnl))
            .map(TradeRef::from),
        daily_pnl: daily(trades),
        per_symbol: include_symbols.then(|| per_symbol(trades)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TradeSide;
    use chrono::{Duration, TimeZone, Utc};

    fn trade(id: &str, symbol: &str, pnl: f64, roi: Option<f64>, day: i64) -> Trade {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::days(day);
        Trade {
            id: id.to_string(),
            user_id: "u".to_string(),
            symbol: symbol.to_string(),
            side: TradeSide::Long,
            entry_price: None,
            exit_price: None,
            quantity: None,
            pnl,
            roi,
            notes: None,
            screenshot_url: None,
            traded_at: at,
            created_at: at,
        }
    }

    #[test]
    fn test_empty() {
        let a = compute_analytics(&[], true);
        assert_eq!(a.total_trades, 0);
        assert_eq!(a.win_rate, 0.0);
        assert!(a.best_trade.is_none());
        assert!(a.profit_factor.is_none());
        assert_eq!(a.per_symbol, Some(vec![]));
    }

    #[test]
    fn test_summary() {
        let trades = vec![
            trade("1", "BTC", 100.0, Some(10.0), 0),
            trade("2", "BTC", -50.0, Some(-5.0), 0),
            trade("3", "ETH", 0.0, None, 1),
            trade("4", "ETH", 150.0, Some(15.0), 2),
        ];
        let a = compute_analytics(&trades, false);

        assert_eq!((a.wins, a.losses, a.breakeven), (2, 1, 1));
        assert_eq!(a.win_rate, 50.0);
        assert_eq!(a.total_pnl, 200.0);
        assert_eq!(a.average_pnl, 50.0);
        assert_eq!(a.average_roi, Some(20.0 / 3.0));
        assert_eq!(a.profit_factor, Some(5.0));
        assert_eq!(a.best_trade.unwrap().id, "4");
        assert_eq!(a.worst_trade.unwrap().id, "2");
        assert!(a.per_symbol.is_none());

        assert_eq!(a.daily_pnl.len(), 3);
        assert_eq!(a.daily_pnl[0].pnl, 50.0);
        assert_eq!(a.daily_pnl[2].cumulative_pnl, 200.0);
    }

    #[test]
    fn test_per_symbol_sorted_by_pnl() {
        let trades = vec![
            trade("1", "BTC", 10.0, None, 0),
            trade("2", "ETH", 40.0, None, 0),
            trade("3", "ETH", -10.0, None, 0),
        ];
        let symbols = compute_analytics(&trades, true).per_symbol.unwrap();
        assert_eq!(symbols[0].symbol, "ETH");
        assert_eq!(symbols[0].trades, 2);
        assert_eq!(symbols[0].win_rate, 50.0);
        assert_eq!(symbols[1].average_pnl, 10.0);
    }
}
