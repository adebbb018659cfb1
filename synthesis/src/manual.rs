/*!

This is the long-form manual for `synthesis` and `synthrep`.

## Input layout

`synthrep` reads the output of the survey processing for one client. The client
directory holds one sub-directory per product level (`OSE_HS`, `FAM_ES`, ...):

```text
<client>/
  OSE_HS/
    agg/allmean.csv       mean scores, one row per target and round
    agg/highprop.csv      percent-positive shares
    agg/allcount.csv      response counts
    <entity>/agg/pct.csv  percentiles of one entity (the client or a school)
    data/roundMeta.csv    round codes, identifiers and labels
    data/schoolMeta.csv   the schools of the client
  FAM_HS/
    ...
```

Directories that are not product levels are ignored, and so is the teacher
feedback survey (`FFT_*`), which has no column in the report templates.

The `target` column identifies the entity and the round of a row: `Davis:19O` is
the client `Davis` in round `19O`. Empty, `NA` and `nan` cells are missing values.
The value `-1000` marks a suppressed metric and is shown as N/A.

With `--input-type xlsx`, every table is read from the first sheet of the
`.xlsx` file with the same name.

### Round metadata

```text
rnd,RoundID,SurveyPeriod
19O,19,October 2019
18O,18,October 2018
```

Every round found in the score tables must be listed here, otherwise the run stops.

### School metadata

```text
ClientName,round,genTarget,SchoolName,current,respTarget
Davis,19O,DHS,Davis Senior High School,1,1200
```

`respTarget` is the surveyed population used for the response rates. When it is
missing, the population and the rate read N/A, and so does every total it is part of.

## Report template

The layout of the tables comes from a JSON file (`--config`):

```json
{
  "districtFactors": { "OSE_HS": ["eng_hs", "rig_hs", "rel_hs", "cult_hs"] },
  "schoolFactors": { "OSE_HS": ["eng_hs", "rel_hs", "cult_hs"] },
  "commonThemes": ["Engagement", "Relationships", "Culture"],
  "itemTables": [
    { "name": "edqual", "title": "Educational quality", "variables": { "OSE_HS": "edqual_hs" } }
  ],
  "themeBars": {
    "eng_theme_bar": { "OSE_HS": "eng_hs", "FAM_HS": "fam_eng_hs" }
  }
}
```

The factor lists fill the rows of the `all_factors` tables in order, within the
block of their stakeholder group. An empty string leaves a row without metric.

## Trends and quartiles

Every metric cell shows the value of the current round, coloured by the quartile
of its percentile, and an arrow comparing it with the previous round. A metric
without a previous round, or with a suppressed value on either side, has no arrow.

When a percent-positive metric has no percentile, its column is withheld: every
cell of the same product level in that column reads N/A. Use
`--withhold-scope cell` to only clear the cell itself.

## Output

The reports are written to `Synthesis Report_<client>.json` in the client
directory (or `--out-dir`), as a document `{"version": "2.0", "reports": [...]}`
with the district report, the multilevel reports and the school reports.

 */
