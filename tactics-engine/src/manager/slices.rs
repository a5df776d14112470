//! View-slice builders
//!
//! Slices are rebuilt from canonical records on every pull. Getters return
//! `Err(EmptySelection)` when their surface must render its empty state.

use super::StateManager;
use crate::palette::{cluster_color, group_colors, palette_color};
use crate::record::EntityRecord;
use crate::table::{passes_brushes, query_rows, TableColumn, TableQuery};
use crate::views::{
    format_value, summary_label, AttributeOption, ControlsView, CorrelationView, GroupOption,
    HeaderGroup, PlotDimension, PlotPayload, PlotRow, TableCell, TableHeader, TableRow, TableView,
    ViewSlice, WeightGroup, WeightSlider,
};
use crate::{Error, Result};
use tactics_common::events::{EmptyReason, ViewKind};

fn number_text(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format_value(value)
    }
}

impl StateManager {
    /// Slice for any surface
    pub fn view_slice(&self, kind: ViewKind) -> Result<ViewSlice> {
        Ok(match kind {
            ViewKind::Correlation => ViewSlice::Correlation(self.correlation_view()?),
            ViewKind::Plot => ViewSlice::Plot(self.plot_payload()?),
            ViewKind::Table => ViewSlice::Table(self.table_view()?),
            ViewKind::Controls => ViewSlice::Controls(self.controls_view()),
        })
    }

    /// Heatmap slice
    pub fn correlation_view(&self) -> Result<CorrelationView> {
        if self.state.active_groups.is_empty() {
            return Err(Error::EmptySelection(EmptyReason::NoGroups));
        }
        let matrix = self
            .correlation
            .as_ref()
            .ok_or(Error::EmptySelection(EmptyReason::NoAttributes))?;

        Ok(CorrelationView {
            attributes: matrix.attributes().to_vec(),
            titles: matrix
                .attributes()
                .iter()
                .map(|id| self.registry.title(id).to_string())
                .collect(),
            values: matrix.values().to_vec(),
            text: matrix
                .values()
                .iter()
                .map(|row| row.iter().map(|v| format_value(*v)).collect())
                .collect(),
            selected: matrix
                .attributes()
                .iter()
                .map(|id| self.state.is_attribute_active(id))
                .collect(),
            degenerate: matrix.degenerate_pairs().to_vec(),
        })
    }

    /// Multi-axis plot slice
    pub fn plot_payload(&self) -> Result<PlotPayload> {
        if let Some(reason) = self.empty_reason() {
            return Err(Error::EmptySelection(reason));
        }
        let rows = self.visible_records();

        let base_columns = if self.state.active_groups.len() == 1 {
            vec![self.registry.entity_title().to_string()]
        } else {
            vec![
                self.registry.group_title().to_string(),
                self.registry.entity_title().to_string(),
            ]
        };

        let dimensions: Vec<PlotDimension> = self
            .state
            .active_attributes
            .iter()
            .filter(|id| rows.iter().any(|r| r.has_attribute(id)))
            .map(|id| PlotDimension {
                id: id.clone(),
                title: self.registry.title(id).to_string(),
                group: self.registry.group_of(id).map(str::to_string),
                ticks: self.registry.scale(id).map(|s| s.ticks()).unwrap_or_default(),
                brush: self.state.brushes.get(id).map(|b| b.bounds()),
            })
            .collect();

        let color_by_cluster = self.state.cluster_count > 0;
        let colors = group_colors(&self.state.active_groups);
        let any_highlight = !self.state.highlighted.is_empty();

        let plot_rows = rows
            .iter()
            .map(|record| {
                let color = if color_by_cluster {
                    record.cluster().map_or(palette_color(0), cluster_color)
                } else {
                    colors.get(record.group()).copied().unwrap_or(palette_color(0))
                };
                let highlighted = self.state.highlighted.contains(record.key());
                PlotRow {
                    key: record.key().clone(),
                    values: dimensions
                        .iter()
                        .map(|d| (d.id.clone(), record.value(&d.id)))
                        .collect(),
                    weighted_score: record.weighted_score(),
                    cluster: record.cluster(),
                    color,
                    highlighted,
                    dimmed: any_highlight && !highlighted,
                    brushed_out: !passes_brushes(record, &self.state.brushes),
                }
            })
            .collect();

        Ok(PlotPayload {
            base_columns,
            dimensions,
            rows: plot_rows,
            color_by_cluster,
            display: self.state.display,
        })
    }

    /// Visible columns: identity, active attributes, then derived fields when present
    pub fn table_columns(&self) -> Vec<TableColumn> {
        let rows = self.visible_records();
        let mut columns = vec![TableColumn::Group, TableColumn::Entity];
        columns.extend(
            self.state
                .active_attributes
                .iter()
                .map(|id| TableColumn::Attribute(id.clone())),
        );
        if rows.iter().any(|r| r.cluster().is_some()) {
            columns.push(TableColumn::Cluster);
        }
        if rows.iter().any(|r| r.weighted_score().is_some()) {
            columns.push(TableColumn::WeightedScore);
        }
        columns
    }

    fn table_header(&self, column: TableColumn) -> TableHeader {
        let (title, group) = match &column {
            TableColumn::Group => (self.registry.group_title(), self.registry.entity_title()),
            TableColumn::Entity => (self.registry.entity_title(), self.registry.entity_title()),
            TableColumn::Attribute(id) => (
                self.registry.title(id),
                self.registry.group_of(id).unwrap_or("Other"),
            ),
            TableColumn::Cluster => ("Cluster", "Cluster"),
            TableColumn::WeightedScore => ("Weighted Score", "Score"),
        };
        TableHeader {
            title: title.to_string(),
            group: group.to_string(),
            column,
        }
    }

    fn table_cell(&self, record: &EntityRecord, column: &TableColumn) -> TableCell {
        let numeric = |value: Option<f64>, text: fn(f64) -> String| TableCell {
            text: value.map(text).unwrap_or_default(),
            value,
        };
        match column {
            TableColumn::Group => TableCell {
                text: record.group().to_string(),
                value: None,
            },
            TableColumn::Entity => TableCell {
                text: record.entity().to_string(),
                value: None,
            },
            TableColumn::Attribute(id) => match record.label(id) {
                Some(label) => TableCell {
                    text: label.to_string(),
                    value: record.value(id),
                },
                None => numeric(record.value(id), number_text),
            },
            TableColumn::Cluster => numeric(record.cluster().map(f64::from), number_text),
            TableColumn::WeightedScore => numeric(record.weighted_score(), format_value),
        }
    }

    /// Row table slice
    pub fn table_view(&self) -> Result<TableView> {
        if self.state.active_groups.is_empty() {
            return Err(Error::EmptySelection(EmptyReason::NoGroups));
        }
        let headers: Vec<TableHeader> = self
            .table_columns()
            .into_iter()
            .map(|c| self.table_header(c))
            .collect();

        let mut header_groups: Vec<HeaderGroup> = Vec::new();
        for header in &headers {
            match header_groups.last_mut() {
                Some(last) if last.name == header.group => last.span += 1,
                _ => header_groups.push(HeaderGroup {
                    name: header.group.clone(),
                    span: 1,
                }),
            }
        }

        let visible = self.visible_records();
        let page = query_rows(
            &visible,
            &TableQuery {
                search: &self.state.search_text,
                brushes: &self.state.brushes,
                sort: self.state.sort.as_ref(),
                page: self.state.page,
                page_size: self.config.page_size,
            },
        );

        let filtered = self.filtered_records();
        let all_selected = !filtered.is_empty()
            && filtered
                .iter()
                .all(|r| self.state.highlighted.contains(r.key()));

        let rows = page
            .rows
            .iter()
            .map(|record| TableRow {
                key: record.key().clone(),
                cells: headers
                    .iter()
                    .map(|h| self.table_cell(record, &h.column))
                    .collect(),
                selected: self.state.highlighted.contains(record.key()),
            })
            .collect();

        Ok(TableView {
            headers,
            header_groups,
            rows,
            page: page.page,
            total_pages: page.total_pages,
            total_rows: page.total_rows,
            sort: self.state.sort.clone(),
            search: self.state.search_text.clone(),
            all_selected,
        })
    }

    /// Widget panel slice (never empty)
    pub fn controls_view(&self) -> ControlsView {
        let k = self.state.cluster_count;
        let colors = group_colors(&self.state.active_groups);

        let groups = self
            .all_groups
            .iter()
            .map(|g| GroupOption {
                name: g.clone(),
                selected: self.state.is_group_active(g),
                color: if k == 0 { colors.get(g).copied() } else { None },
            })
            .collect();

        let attributes = self
            .all_attributes
            .iter()
            .map(|id| AttributeOption {
                id: id.clone(),
                title: self.registry.title(id).to_string(),
                selected: self.state.is_attribute_active(id),
            })
            .collect();

        let weights = self
            .registry
            .groups()
            .iter()
            .map(|group| WeightGroup {
                group: group.clone(),
                sliders: self
                    .registry
                    .attributes_in_group(group)
                    .filter(|a| self.state.is_attribute_active(&a.id))
                    .filter_map(|a| {
                        self.state.weights.get(&a.id).map(|w| WeightSlider {
                            id: a.id.clone(),
                            title: a.title.clone(),
                            value: *w,
                        })
                    })
                    .collect(),
            })
            .filter(|g: &WeightGroup| !g.sliders.is_empty())
            .collect();

        ControlsView {
            group_label: summary_label(
                &self.state.active_groups,
                self.all_groups.len(),
                self.registry.group_title(),
                |s| s.to_string(),
            ),
            groups,
            attribute_label: summary_label(
                &self.state.active_attributes,
                self.all_attributes.len(),
                "Column",
                |id| self.registry.title(id).to_string(),
            ),
            attributes,
            weights,
            weights_pending: self.state.applied_weights.as_ref() != Some(&self.state.weights),
            cluster_options: self.config.cluster_options.clone(),
            cluster_count: k,
            show_cluster_selector: k == 0,
            show_smoothness_bundling: k > 0,
            display: self.state.display,
        }
    }
}
